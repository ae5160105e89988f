//! Image processing in pure Rust, in memory, with no system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3 `resize_exact` |
//! | **Encode** | lossless WebP, or AVIF via rav1e |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`compress`], combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::derivative_dimensions;
pub use operations::{DerivedImage, compress, derivative_name, plan_resize};
pub use params::{DerivativeFormat, DerivativeSpec, Quality, ResizeParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
