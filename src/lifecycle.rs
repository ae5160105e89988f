//! Lifecycle hooks for articles and gallery photos.
//!
//! The repository layer ([`Site`](crate::site::Site)) calls these explicitly
//! around every write:
//!
//! ```text
//! validate ─► pre-save ─► write row ─► post-create ─► commit
//!                │                         │
//!                └── new files stored      └── thumbnail renamed to embed id
//! ```
//!
//! Pre-save hooks store new files and report which old files the save
//! supersedes in a [`FileChanges`]. The caller deletes those with
//! [`FileChanges::commit`] once the row is written, or throws the new files
//! away with [`FileChanges::abandon`] if the write fails. Post-create writes
//! the renamed key back without running pre-save again, so there is no path
//! by which a hook can re-trigger itself.

use crate::article::{
    Article, ArticleId, PLACEHOLDER_TOKEN, finalize_thumbnail_key, has_placeholder, thumbnail_key,
};
use crate::config::SiteConfig;
use crate::gallery::{GalleryPhoto, photo_key};
use crate::imaging::{self, BackendError, ImageBackend};
use crate::slug::unique_slugify;
use crate::storage::{MediaStorage, StorageError, delete_best_effort};
use crate::types::ImageInput;
use crate::validate::ValidationErrors;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Image processing failed: {0}")]
    Image(#[from] BackendError),
    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// What a save does to an entity's images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePlan {
    /// Same image as before: no compression, no deletion.
    Unchanged,
    /// New image: generate a derivative, then drop `discard`.
    Generate { discard: Vec<String> },
}

/// Decide what a save does to the images of an entity.
///
/// `previous` holds the keys stored on the prior row (empty on create).
/// Keys for which `is_pending` holds were never finalized and are left alone.
pub fn plan_image_update(
    previous: &[&str],
    incoming: &ImageInput,
    is_pending: impl Fn(&str) -> bool,
) -> ImagePlan {
    match incoming {
        ImageInput::Keep => ImagePlan::Unchanged,
        ImageInput::Upload(_) => ImagePlan::Generate {
            discard: previous
                .iter()
                .filter(|key| !key.is_empty() && !is_pending(key))
                .map(|key| key.to_string())
                .collect(),
        },
    }
}

/// Files a pre-save hook wrote, and files the save supersedes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChanges {
    pub stored: Vec<String>,
    pub discard: Vec<String>,
}

impl FileChanges {
    /// Row written: delete superseded files. Returns how many were removed.
    pub fn commit(self, storage: &impl MediaStorage) -> usize {
        self.discard
            .iter()
            .filter(|key| delete_best_effort(storage, key))
            .count()
    }

    /// Row not written: delete the files this save created.
    pub fn abandon(self, storage: &impl MediaStorage) {
        for key in &self.stored {
            delete_best_effort(storage, key);
        }
    }
}

/// A value produced by a pre-save hook along with its file bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared<T> {
    pub value: T,
    pub changes: FileChanges,
}

/// Pick the slug to store for an entity.
///
/// An explicit slug is kept as typed and must be free. Without one, an
/// existing row keeps `current`, and a new row derives a unique slug from
/// its title. `taken` must not report the entity's own slug.
pub fn resolve_slug(
    explicit: Option<&str>,
    title: &str,
    current: Option<&str>,
    max_len: usize,
    taken: impl Fn(&str) -> bool,
) -> Result<String, ValidationErrors> {
    match (explicit, current) {
        (Some(slug), _) if taken(slug) => Err(ValidationErrors::single(
            "slug",
            format!("slug {slug:?} is already in use"),
        )),
        (Some(slug), _) => Ok(slug.to_string()),
        (None, Some(current)) => Ok(current.to_string()),
        (None, None) => Ok(unique_slugify(taken, title, max_len)),
    }
}

// =============================================================================
// Articles
// =============================================================================

/// Compress and store a new thumbnail if one was uploaded.
///
/// `id` is `None` on create; the key then carries [`PLACEHOLDER_TOKEN`]
/// until [`article_post_create`] renames it. Returns `None` when the
/// thumbnail is unchanged.
pub fn article_pre_save(
    storage: &impl MediaStorage,
    backend: &impl ImageBackend,
    config: &SiteConfig,
    id: Option<ArticleId>,
    previous: Option<&str>,
    incoming: &ImageInput,
) -> Result<Option<Prepared<String>>, HookError> {
    let previous: Vec<&str> = previous.into_iter().collect();
    let discard = match plan_image_update(&previous, incoming, has_placeholder) {
        ImagePlan::Unchanged => return Ok(None),
        ImagePlan::Generate { discard } => discard,
    };
    let Some(upload) = incoming.upload() else {
        return Ok(None);
    };
    if let Some(pending) = previous.iter().find(|k| has_placeholder(k)) {
        tracing::warn!(key = %pending, "previous thumbnail was never finalized, leaving it in place");
    }

    let derived = imaging::compress(backend, upload, &config.article_spec())?;
    let token = id.map_or_else(|| PLACEHOLDER_TOKEN.to_string(), |id| id.to_string());
    let key = thumbnail_key(&config.articles.upload_dir, &token, &derived.name);
    let stored = storage.save(&key, &derived.bytes)?;
    tracing::info!(key = %stored, width = derived.width, height = derived.height, "stored thumbnail");

    Ok(Some(Prepared {
        value: stored.clone(),
        changes: FileChanges {
            stored: vec![stored],
            discard,
        },
    }))
}

/// Rename a freshly created article's thumbnail to embed its id.
///
/// Returns the new key to write back to the row, or `None` if the key had no
/// placeholder.
pub fn article_post_create(
    storage: &impl MediaStorage,
    id: ArticleId,
    thumbnail: &str,
) -> Result<Option<String>, HookError> {
    let Some(target) = finalize_thumbnail_key(thumbnail, id) else {
        return Ok(None);
    };
    let renamed = storage.rename(thumbnail, &target)?;
    tracing::info!(from = %thumbnail, to = %renamed, "finalized thumbnail name");
    Ok(Some(renamed))
}

/// Move `renamed` back to `original` after the row that would have pointed at
/// it failed to save. Failures are logged, not returned.
pub fn undo_rename(storage: &impl MediaStorage, renamed: &str, original: &str) -> bool {
    match storage.rename(renamed, original) {
        Ok(key) if key == original => true,
        Ok(key) => {
            tracing::warn!(%original, %key, "thumbnail restored under a different name");
            false
        }
        Err(e) => {
            tracing::warn!(%renamed, %original, error = %e, "could not restore thumbnail name");
            false
        }
    }
}

/// Remove an article's thumbnail. The row is not touched.
pub fn article_pre_delete(storage: &impl MediaStorage, article: &Article) -> usize {
    usize::from(delete_best_effort(storage, &article.thumbnail))
}

// =============================================================================
// Gallery
// =============================================================================

/// Storage keys of a gallery photo's two files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFiles {
    pub full: String,
    pub compressed: String,
}

/// Store a new full image and its derivative if one was uploaded.
///
/// The derivative is generated before anything is written, so an
/// undecodable upload leaves storage untouched.
pub fn gallery_pre_save(
    storage: &impl MediaStorage,
    backend: &impl ImageBackend,
    config: &SiteConfig,
    previous: Option<&GalleryPhoto>,
    incoming: &ImageInput,
) -> Result<Option<Prepared<PhotoFiles>>, HookError> {
    let previous = previous.map(GalleryPhoto::files).unwrap_or_default();
    let discard = match plan_image_update(&previous, incoming, |_| false) {
        ImagePlan::Unchanged => return Ok(None),
        ImagePlan::Generate { discard } => discard,
    };
    let Some(upload) = incoming.upload() else {
        return Ok(None);
    };

    let derived = imaging::compress(backend, upload, &config.gallery_spec())?;
    let dir = &config.gallery.upload_dir;
    let full = storage.save(&photo_key(dir, upload.file_name()), &upload.bytes)?;
    let compressed = match storage.save(&photo_key(dir, &derived.name), &derived.bytes) {
        Ok(key) => key,
        Err(e) => {
            delete_best_effort(storage, &full);
            return Err(e.into());
        }
    };
    tracing::info!(%full, %compressed, "stored gallery photo");

    Ok(Some(Prepared {
        value: PhotoFiles {
            full: full.clone(),
            compressed: compressed.clone(),
        },
        changes: FileChanges {
            stored: vec![full, compressed],
            discard,
        },
    }))
}

/// Remove both files of a gallery photo. Safe to run more than once.
pub fn gallery_pre_delete(storage: &impl MediaStorage, photo: &GalleryPhoto) -> usize {
    photo
        .files()
        .into_iter()
        .filter(|key| delete_best_effort(storage, key))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::Status;
    use crate::category::CategoryId;
    use crate::gallery::PhotoId;
    use crate::imaging::backend::tests::MockBackend;
    use crate::storage::tests::{MemoryStorage, StorageOp};
    use crate::types::UploadedFile;
    use chrono::Utc;

    fn upload(name: &str) -> ImageInput {
        ImageInput::Upload(UploadedFile::new(name, b"source-bytes".to_vec()))
    }

    fn article(thumbnail: &str) -> Article {
        let now = Utc::now();
        Article {
            id: ArticleId(3),
            title: "T".into(),
            slug: "t".into(),
            short_description: "s".into(),
            full_description: "f".into(),
            thumbnail: thumbnail.into(),
            status: Status::Published,
            time_create: now,
            time_update: now,
            category: CategoryId(1),
        }
    }

    // =========================================================================
    // plan_image_update
    // =========================================================================

    #[test]
    fn keep_is_unchanged() {
        let plan = plan_image_update(&["a.webp"], &ImageInput::Keep, |_| false);
        assert_eq!(plan, ImagePlan::Unchanged);
    }

    #[test]
    fn upload_on_create_discards_nothing() {
        let plan = plan_image_update(&[], &upload("a.jpg"), |_| false);
        assert_eq!(plan, ImagePlan::Generate { discard: vec![] });
    }

    #[test]
    fn upload_on_update_discards_previous() {
        let plan = plan_image_update(&["g/a.jpg", "g/a_compressed.webp"], &upload("b.jpg"), |_| false);
        assert_eq!(
            plan,
            ImagePlan::Generate {
                discard: vec!["g/a.jpg".into(), "g/a_compressed.webp".into()]
            }
        );
    }

    #[test]
    fn pending_keys_are_not_discarded() {
        let plan = plan_image_update(
            &["articles/Thmb.id_to_replace.a_compressed.webp"],
            &upload("b.jpg"),
            has_placeholder,
        );
        assert_eq!(plan, ImagePlan::Generate { discard: vec![] });
    }

    // =========================================================================
    // resolve_slug
    // =========================================================================

    #[test]
    fn slug_derived_on_create() {
        let slug = resolve_slug(None, "Kyoto in Autumn", None, 55, |_| false).unwrap();
        assert_eq!(slug, "kyoto-in-autumn");
    }

    #[test]
    fn slug_kept_on_update() {
        let slug = resolve_slug(None, "New title", Some("old-title"), 55, |_| false).unwrap();
        assert_eq!(slug, "old-title");
    }

    #[test]
    fn derived_slug_avoids_collisions() {
        let slug = resolve_slug(None, "Kyoto", None, 55, |s| s == "kyoto").unwrap();
        assert!(slug.starts_with("kyoto-"));
    }

    #[test]
    fn explicit_taken_slug_is_a_form_error() {
        let errors = resolve_slug(Some("kyoto"), "Kyoto", None, 55, |s| s == "kyoto").unwrap_err();
        assert!(errors.has("slug"));
    }

    // =========================================================================
    // Article hooks
    // =========================================================================

    #[test]
    fn create_stores_placeholder_thumbnail() {
        let storage = MemoryStorage::new();
        let backend = MockBackend::new();
        let prepared = article_pre_save(
            &storage,
            &backend,
            &SiteConfig::default(),
            None,
            None,
            &upload("dawn.jpg"),
        )
        .unwrap()
        .unwrap();

        assert_eq!(prepared.value, "articles/Thmb.id_to_replace.dawn_compressed.webp");
        assert_eq!(storage.contents(&prepared.value).unwrap(), b"derived:600x400");
        assert!(prepared.changes.discard.is_empty());
        assert_eq!(backend.resize_count(), 1);
    }

    #[test]
    fn update_uses_real_id_and_discards_old() {
        let storage = MemoryStorage::new();
        storage.save("articles/Thmb.3.old_compressed.webp", b"old").unwrap();
        let prepared = article_pre_save(
            &storage,
            &MockBackend::new(),
            &SiteConfig::default(),
            Some(ArticleId(3)),
            Some("articles/Thmb.3.old_compressed.webp"),
            &upload("new.png"),
        )
        .unwrap()
        .unwrap();

        assert_eq!(prepared.value, "articles/Thmb.3.new_compressed.webp");
        // Nothing deleted until the row is written
        assert!(storage.exists("articles/Thmb.3.old_compressed.webp"));
        assert_eq!(prepared.changes.commit(&storage), 1);
        assert!(!storage.exists("articles/Thmb.3.old_compressed.webp"));
    }

    #[test]
    fn keep_touches_nothing() {
        let storage = MemoryStorage::new();
        let backend = MockBackend::new();
        let prepared = article_pre_save(
            &storage,
            &backend,
            &SiteConfig::default(),
            Some(ArticleId(3)),
            Some("articles/Thmb.3.a_compressed.webp"),
            &ImageInput::Keep,
        )
        .unwrap();
        assert!(prepared.is_none());
        assert!(storage.get_operations().is_empty());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn undecodable_upload_stores_nothing() {
        let storage = MemoryStorage::new();
        let empty = ImageInput::Upload(UploadedFile::new("broken.jpg", Vec::new()));
        let result = article_pre_save(
            &storage,
            &MockBackend::new(),
            &SiteConfig::default(),
            None,
            None,
            &empty,
        );
        assert!(matches!(result, Err(HookError::Image(_))));
        assert!(storage.get_operations().is_empty());
    }

    #[test]
    fn post_create_renames_placeholder() {
        let storage = MemoryStorage::new();
        let key = storage
            .save("articles/Thmb.id_to_replace.a_compressed.webp", b"x")
            .unwrap();
        let renamed = article_post_create(&storage, ArticleId(12), &key).unwrap();
        assert_eq!(renamed.as_deref(), Some("articles/Thmb.12.a_compressed.webp"));
        assert!(!storage.exists(&key));
        assert_eq!(storage.contents("articles/Thmb.12.a_compressed.webp").unwrap(), b"x");
    }

    #[test]
    fn post_create_keeps_token_in_uploaded_name() {
        let storage = MemoryStorage::new();
        let key = storage
            .save("articles/Thmb.id_to_replace.id_to_replace_compressed.webp", b"x")
            .unwrap();
        let renamed = article_post_create(&storage, ArticleId(4), &key).unwrap();
        assert_eq!(
            renamed.as_deref(),
            Some("articles/Thmb.4.id_to_replace_compressed.webp")
        );

        // The finalized key is no longer pending, so a second pass does nothing
        storage.clear_operations();
        let again = article_post_create(&storage, ArticleId(4), renamed.as_deref().unwrap()).unwrap();
        assert_eq!(again, None);
        assert!(storage.get_operations().is_empty());
    }

    #[test]
    fn finalized_key_with_token_in_name_is_discarded_on_replace() {
        let previous = "articles/Thmb.4.id_to_replace_compressed.webp";
        let plan = plan_image_update(&[previous], &upload("b.jpg"), has_placeholder);
        assert_eq!(
            plan,
            ImagePlan::Generate {
                discard: vec![previous.to_string()]
            }
        );
    }

    #[test]
    fn undo_rename_restores_original_key() {
        let storage = MemoryStorage::new();
        storage.save("articles/Thmb.7.a.webp", b"x").unwrap();
        assert!(undo_rename(
            &storage,
            "articles/Thmb.7.a.webp",
            "articles/Thmb.id_to_replace.a.webp"
        ));
        assert_eq!(
            storage.contents("articles/Thmb.id_to_replace.a.webp").unwrap(),
            b"x"
        );
        assert!(!storage.exists("articles/Thmb.7.a.webp"));
    }

    #[test]
    fn undo_rename_of_missing_file_is_reported_not_raised() {
        let storage = MemoryStorage::new();
        assert!(!undo_rename(&storage, "articles/gone.webp", "articles/a.webp"));
    }

    #[test]
    fn post_create_without_placeholder_is_noop() {
        let storage = MemoryStorage::new();
        let renamed = article_post_create(&storage, ArticleId(1), "articles/Thmb.1.a.webp").unwrap();
        assert_eq!(renamed, None);
        assert!(storage.get_operations().is_empty());
    }

    #[test]
    fn pre_delete_removes_thumbnail_once() {
        let storage = MemoryStorage::new();
        let key = storage.save("articles/Thmb.3.a_compressed.webp", b"x").unwrap();
        let a = article(&key);
        assert_eq!(article_pre_delete(&storage, &a), 1);
        assert_eq!(article_pre_delete(&storage, &a), 0);
    }

    #[test]
    fn abandon_removes_stored_files() {
        let storage = MemoryStorage::new();
        let prepared = article_pre_save(
            &storage,
            &MockBackend::new(),
            &SiteConfig::default(),
            None,
            None,
            &upload("a.jpg"),
        )
        .unwrap()
        .unwrap();
        prepared.changes.abandon(&storage);
        assert!(!storage.exists(&prepared.value));
    }

    // =========================================================================
    // Gallery hooks
    // =========================================================================

    #[test]
    fn gallery_create_stores_full_and_compressed() {
        let storage = MemoryStorage::new();
        let prepared = gallery_pre_save(
            &storage,
            &MockBackend::new(),
            &SiteConfig::default(),
            None,
            &upload("dawn.jpg"),
        )
        .unwrap()
        .unwrap();

        assert_eq!(prepared.value.full, "gallery/dawn.jpg");
        assert_eq!(prepared.value.compressed, "gallery/dawn_compressed.webp");
        assert_eq!(storage.contents("gallery/dawn.jpg").unwrap(), b"source-bytes");
        // 1200x800 source at 700 wide
        assert_eq!(
            storage.contents("gallery/dawn_compressed.webp").unwrap(),
            b"derived:700x467"
        );
    }

    #[test]
    fn gallery_update_discards_both_previous_files() {
        let storage = MemoryStorage::new();
        let previous = GalleryPhoto {
            id: PhotoId(1),
            title: "Dawn".into(),
            content: "Bay".into(),
            photo_full: storage.save("gallery/dawn.jpg", b"a").unwrap(),
            photo_compressed: Some(storage.save("gallery/dawn_compressed.webp", b"b").unwrap()),
        };
        let prepared = gallery_pre_save(
            &storage,
            &MockBackend::new(),
            &SiteConfig::default(),
            Some(&previous),
            &upload("dusk.jpg"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(prepared.changes.commit(&storage), 2);
        assert!(!storage.exists("gallery/dawn.jpg"));
        assert!(!storage.exists("gallery/dawn_compressed.webp"));
        assert!(storage.exists("gallery/dusk.jpg"));
    }

    #[test]
    fn gallery_same_name_upload_gets_alternate_key() {
        let storage = MemoryStorage::new();
        storage.save("gallery/dawn.jpg", b"old").unwrap();
        let prepared = gallery_pre_save(
            &storage,
            &MockBackend::new(),
            &SiteConfig::default(),
            None,
            &upload("dawn.jpg"),
        )
        .unwrap()
        .unwrap();
        assert_ne!(prepared.value.full, "gallery/dawn.jpg");
        assert_eq!(storage.contents("gallery/dawn.jpg").unwrap(), b"old");
    }

    #[test]
    fn gallery_delete_twice_does_not_fail() {
        let storage = MemoryStorage::new();
        let photo = GalleryPhoto {
            id: PhotoId(1),
            title: "Dawn".into(),
            content: "Bay".into(),
            photo_full: storage.save("gallery/dawn.jpg", b"a").unwrap(),
            photo_compressed: Some(storage.save("gallery/dawn_compressed.webp", b"b").unwrap()),
        };
        assert_eq!(gallery_pre_delete(&storage, &photo), 2);
        assert_eq!(gallery_pre_delete(&storage, &photo), 0);
        assert_eq!(
            storage
                .get_operations()
                .iter()
                .filter(|op| matches!(op, StorageOp::Delete(_)))
                .count(),
            2
        );
    }

    #[test]
    fn gallery_delete_survives_locked_file() {
        let storage = MemoryStorage::new();
        let photo = GalleryPhoto {
            id: PhotoId(1),
            title: "Dawn".into(),
            content: "Bay".into(),
            photo_full: storage.save("gallery/dawn.jpg", b"a").unwrap(),
            photo_compressed: None,
        };
        storage.lock_key("gallery/dawn.jpg");
        assert_eq!(gallery_pre_delete(&storage, &photo), 0);
    }
}
