//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they take a
//! [`DerivativeSpec`], compute parameters, and call the backend. Storing the
//! result is left to the lifecycle hooks.

use super::backend::{BackendError, ImageBackend};
use super::calculations::derivative_dimensions;
use super::params::{DerivativeFormat, DerivativeSpec, ResizeParams};
use crate::types::UploadedFile;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// A freshly generated derivative, not yet stored anywhere.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedImage {
    /// File name derived from the source, e.g. `dawn_compressed.webp`.
    pub name: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for DerivedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedImage")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Name of the derivative generated from `source_name`.
///
/// The last extension is stripped and `_compressed.<ext>` appended. Any
/// client-side directories in `source_name` are dropped.
///
/// ```
/// # use folio::imaging::{derivative_name, DerivativeFormat};
/// assert_eq!(derivative_name("dawn.jpg", DerivativeFormat::WebP), "dawn_compressed.webp");
/// assert_eq!(derivative_name("a.b.png", DerivativeFormat::Avif), "a.b_compressed.avif");
/// ```
pub fn derivative_name(source_name: &str, format: DerivativeFormat) -> String {
    let file_name = source_name.rsplit(['/', '\\']).next().unwrap_or(source_name);
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    format!("{stem}_compressed.{}", format.extension())
}

/// Plan the resize for a source of the given dimensions.
pub fn plan_resize(source_dims: (u32, u32), spec: &DerivativeSpec) -> ResizeParams {
    let (width, height) = derivative_dimensions(source_dims, spec.width);
    ResizeParams {
        width,
        height,
        format: spec.format,
        quality: spec.quality,
    }
}

/// Produce a resized, re-encoded derivative of `source`.
///
/// Pure transformation: bytes in, bytes plus a name out.
pub fn compress(
    backend: &impl ImageBackend,
    source: &UploadedFile,
    spec: &DerivativeSpec,
) -> Result<DerivedImage> {
    let dims = backend.identify(&source.bytes)?;
    let params = plan_resize((dims.width, dims.height), spec);
    let bytes = backend.resize(&source.bytes, &params)?;

    tracing::debug!(
        source = %source.name,
        from = %format!("{}x{}", dims.width, dims.height),
        to = %format!("{}x{}", params.width, params.height),
        format = %params.format,
        "generated derivative"
    );

    Ok(DerivedImage {
        name: derivative_name(&source.name, spec.format),
        bytes,
        width: params.width,
        height: params.height,
    })
}
