//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the derivative
//! pipeline needs: identify and resize. Both work on in-memory bytes; where
//! those bytes come from and where the result goes is the caller's business.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, everything
//! statically linked into the binary.

use super::params::ResizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Implementations must be pure transformations: no file-system access, no
/// global state. That keeps the lifecycle hooks testable with a mock.
pub trait ImageBackend: Sync {
    /// Decode just enough of `source` to report its dimensions.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode `source`, resize it to exactly `params.width` x `params.height`
    /// and re-encode it in `params.format`.
    fn resize(&self, source: &[u8], params: &ResizeParams) -> Result<Vec<u8>, BackendError>;
}
