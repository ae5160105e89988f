//! Shared test utilities for the folio test suite.
//!
//! Provides synthetic image fixtures, form builders with valid defaults, and
//! an in-memory [`Site`] wired to the recording storage and backend doubles.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let mut site = memory_site();
//! let cat = site.create_category(Caller::Staff, category_form("Travel", None)).unwrap();
//! site.create_article(Caller::Staff, article_form("Kyoto", cat), upload("dawn.jpg")).unwrap();
//! ```

use crate::article::{ArticleForm, Status};
use crate::category::{CategoryForm, CategoryId};
use crate::config::SiteConfig;
use crate::gallery::PhotoForm;
use crate::imaging::backend::tests::MockBackend;
use crate::site::Site;
use crate::storage::tests::MemoryStorage;
use crate::store::Store;
use crate::types::{ImageInput, UploadedFile};
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Image fixtures
// =========================================================================

/// A gradient JPEG of the given size, encoded in memory.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

/// A half-transparent RGBA PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 255 } else { 64 };
        Rgba([200, 40, 40, alpha])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

// =========================================================================
// Forms
// =========================================================================

pub fn category_form(title: &str, parent: Option<CategoryId>) -> CategoryForm {
    CategoryForm {
        title: title.to_string(),
        slug: None,
        description: format!("All about {title}"),
        parent,
    }
}

/// A published article form with an auto-derived slug.
pub fn article_form(title: &str, category: CategoryId) -> ArticleForm {
    ArticleForm {
        title: title.to_string(),
        slug: None,
        short_description: format!("{title} in brief"),
        full_description: format!("<p>{title} at length.</p>"),
        status: Status::Published,
        category,
    }
}

pub fn photo_form(title: &str) -> PhotoForm {
    PhotoForm {
        title: title.to_string(),
        content: format!("{title} caption"),
    }
}

/// An upload whose bytes only the mock backend will accept.
pub fn upload(name: &str) -> ImageInput {
    ImageInput::Upload(UploadedFile::new(name, format!("bytes of {name}").into_bytes()))
}

// =========================================================================
// Sites
// =========================================================================

/// A site with stock config, an empty store, and recording doubles.
pub fn memory_site() -> Site<MemoryStorage, MockBackend> {
    Site::new(
        SiteConfig::default(),
        Store::new(),
        MemoryStorage::new(),
        MockBackend::new(),
    )
}
