//! Media file storage.
//!
//! Rows never hold file contents, only storage keys: relative,
//! `/`-separated paths such as `gallery/dawn_compressed.webp`. The
//! [`MediaStorage`] trait is the only way the rest of the crate touches those
//! files, so the lifecycle hooks can run against a recording in-memory store
//! in tests and against [`FileSystemStorage`] in production.
//!
//! ## Never overwrite
//!
//! `save` and `rename` never clobber an existing file. When the requested key
//! is taken, a 7-character random suffix is inserted before the extension
//! (`dawn.jpg` → `dawn_k3J9xQa.jpg`) and the key actually used is returned.
//! Callers must store the returned key, not the one they asked for.
//!
//! ## Best-effort cleanup
//!
//! Deleting superseded files is cleanup, not correctness: a missing file or
//! a permission error must never fail the save that triggered it. Use
//! [`delete_best_effort`] for that; it logs and moves on.

use rand::Rng;
use rand::distr::Alphanumeric;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Length of the suffix inserted into a taken key.
const ALTERNATE_SUFFIX_LEN: usize = 7;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("No such file: {0}")]
    NotFound(String),
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Key/value file storage for uploaded images and their derivatives.
pub trait MediaStorage {
    /// Store `bytes` under `key`, or under an alternate key if `key` is taken.
    /// Returns the key actually used.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;

    fn open(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    fn exists(&self, key: &str) -> bool;

    /// Remove the file. A missing file is [`StorageError::NotFound`].
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Move `from` to `to` (or an alternate of `to` if taken). Returns the
    /// key actually used.
    fn rename(&self, from: &str, to: &str) -> Result<String, StorageError>;

    /// Public URL of a stored file.
    fn url(&self, key: &str) -> String;

    /// Every stored key, sorted.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Delete `key` if it exists, swallowing any failure.
///
/// Returns `true` if a file was actually removed.
pub fn delete_best_effort(storage: &impl MediaStorage, key: &str) -> bool {
    if key.is_empty() || !storage.exists(key) {
        return false;
    }
    match storage.delete(key) {
        Ok(()) => {
            tracing::info!(%key, "deleted media file");
            true
        }
        Err(e) => {
            tracing::warn!(%key, error = %e, "could not delete media file, leaving it behind");
            false
        }
    }
}

/// Reject absolute keys and keys that climb out of the storage root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.contains('\\')
        || Path::new(key)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if invalid {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Insert `_<suffix>` before the extension of the key's file name.
///
/// ```
/// # use folio::storage::alternate_key;
/// assert_eq!(alternate_key("gallery/dawn.jpg", "abc1234"), "gallery/dawn_abc1234.jpg");
/// assert_eq!(alternate_key("README", "abc1234"), "README_abc1234");
/// ```
pub fn alternate_key(key: &str, suffix: &str) -> String {
    let (dir, file) = match key.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, key),
    };
    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{file}_{suffix}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{file}"),
        None => file,
    }
}

/// First of `key`, `alternate_key(key, random)`, ... that `taken` reports free.
pub fn available_key(key: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(key) {
        return key.to_string();
    }
    loop {
        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(ALTERNATE_SUFFIX_LEN)
            .map(char::from)
            .collect();
        let candidate = alternate_key(key, &suffix);
        if !taken(&candidate) {
            return candidate;
        }
    }
}

/// Media stored as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
    base_url: String,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `key` on disk.
    pub fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn io_err(key: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
        move |source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io {
                    key: key.to_string(),
                    source,
                }
            }
        }
    }

    fn ensure_parent(&self, key: &str, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Self::io_err(key))?;
        }
        Ok(())
    }
}

impl MediaStorage for FileSystemStorage {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        validate_key(key)?;
        let key = available_key(key, |k| self.exists(k));
        let path = self.root.join(&key);
        self.ensure_parent(&key, &path)?;
        fs::write(&path, bytes).map_err(Self::io_err(&key))?;
        Ok(key)
    }

    fn open(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(key)?;
        fs::read(path).map_err(Self::io_err(key))
    }

    fn exists(&self, key: &str) -> bool {
        self.path(key).is_ok_and(|p| p.is_file())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        fs::remove_file(path).map_err(Self::io_err(key))
    }

    fn rename(&self, from: &str, to: &str) -> Result<String, StorageError> {
        let from_path = self.path(from)?;
        validate_key(to)?;
        if !from_path.is_file() {
            return Err(StorageError::NotFound(from.to_string()));
        }
        let to = available_key(to, |k| self.exists(k));
        let to_path = self.root.join(&to);
        self.ensure_parent(&to, &to_path)?;
        fs::rename(&from_path, &to_path).map_err(Self::io_err(from))?;
        Ok(to)
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| StorageError::Io {
                key: e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            keys.push(key.join("/"));
        }
        keys.sort();
        Ok(keys)
    }
}
