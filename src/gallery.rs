//! Gallery photos: a full-resolution upload plus a compressed copy for the
//! grid, both stored under the gallery upload directory.

use crate::validate::ValidationErrors;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TITLE_MAX: usize = 25;
pub const CONTENT_MAX: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(pub u64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryPhoto {
    pub id: PhotoId,
    pub title: String,
    /// Caption.
    pub content: String,
    pub photo_full: String,
    pub photo_compressed: Option<String>,
}

impl GalleryPhoto {
    /// Storage keys owned by this photo.
    pub fn files(&self) -> Vec<&str> {
        std::iter::once(self.photo_full.as_str())
            .chain(self.photo_compressed.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoForm {
    pub title: String,
    pub content: String,
}

impl PhotoForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_text("title", &self.title, TITLE_MAX);
        errors.check_text("content", &self.content, CONTENT_MAX);
        errors.into_result()
    }
}

/// Storage key of a gallery file named `file_name`.
pub fn photo_key(upload_dir: &str, file_name: &str) -> String {
    let dir = upload_dir.trim_end_matches('/');
    if dir.is_empty() {
        file_name.to_string()
    } else {
        format!("{dir}/{file_name}")
    }
}
