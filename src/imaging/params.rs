//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between [`operations`](super::operations), which decides what
//! derivative a hook needs, and the [`backend`](super::backend), which does
//! the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 100). Clamped on construction.
//! - [`DerivativeFormat`]: Output encoding of a derivative (WebP or AVIF).
//! - [`ResizeParams`]: Target dimensions, format and quality for one resize.
//! - [`DerivativeSpec`]: What a lifecycle hook asks for: width, format, quality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Encoding of generated derivatives.
///
/// WebP goes through the `image` crate's lossless encoder, so it is always
/// maximum quality and ignores [`Quality`]. AVIF is lossy and honors it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeFormat {
    #[default]
    WebP,
    Avif,
}

impl DerivativeFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            DerivativeFormat::WebP => "webp",
            DerivativeFormat::Avif => "avif",
        }
    }
}

impl fmt::Display for DerivativeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parameters for a single resize + re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
    pub format: DerivativeFormat,
    pub quality: Quality,
}

/// The derivative a lifecycle hook wants for one image field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivativeSpec {
    pub width: u32,
    pub format: DerivativeFormat,
    pub quality: Quality,
}

impl DerivativeSpec {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            format: DerivativeFormat::default(),
            quality: Quality::default(),
        }
    }
}
