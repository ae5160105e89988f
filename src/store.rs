//! Row storage: every category, article and gallery photo, persisted as one
//! pretty-printed JSON snapshot.
//!
//! The snapshot is read once when a [`Site`](crate::site::Site) is opened and
//! written back after each successful mutation. Writes go to a sibling
//! temporary file first and are then renamed over the old snapshot, so a
//! crash mid-write never leaves a truncated file behind.

use crate::article::{Article, ArticleId};
use crate::category::CategoryTree;
use crate::gallery::{GalleryPhoto, PhotoId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt data file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub categories: CategoryTree,
    pub articles: BTreeMap<ArticleId, Article>,
    pub photos: BTreeMap<PhotoId, GalleryPhoto>,
    next_article_id: u64,
    next_photo_id: u64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Reserve the next article id. Ids are never reused.
    pub fn next_article_id(&mut self) -> ArticleId {
        self.next_article_id = self.next_article_id.max(self.articles.keys().last().map_or(0, |id| id.0));
        self.next_article_id += 1;
        ArticleId(self.next_article_id)
    }

    pub fn next_photo_id(&mut self) -> PhotoId {
        self.next_photo_id = self.next_photo_id.max(self.photos.keys().last().map_or(0, |id| id.0));
        self.next_photo_id += 1;
        PhotoId(self.next_photo_id)
    }

    /// Whether `slug` belongs to an article other than `except`.
    pub fn article_slug_taken(&self, slug: &str, except: Option<ArticleId>) -> bool {
        self.articles
            .values()
            .any(|a| a.slug == slug && Some(a.id) != except)
    }

    /// Every storage key referenced by a row.
    pub fn referenced_keys(&self) -> Vec<&str> {
        let thumbnails = self.articles.values().map(|a| a.thumbnail.as_str());
        let photos = self.photos.values().flat_map(GalleryPhoto::files);
        thumbnails.chain(photos).collect()
    }
}
