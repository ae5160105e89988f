//! The repository: every read and write of categories, articles and gallery
//! photos goes through [`Site`].
//!
//! Each mutation follows the same steps:
//!
//! 1. Check the caller is staff.
//! 2. Validate the form. Nothing has touched storage yet.
//! 3. Run the pre-save hook (compress and store new images).
//! 4. Write the row.
//! 5. Run the post-create hook (articles only: finalize the thumbnail name).
//! 6. Persist the snapshot.
//! 7. Delete superseded files, best effort.
//!
//! If step 5 or 6 fails, the row is put back the way it was and the files
//! stored in step 3 are removed.

use crate::article::{self, Article, ArticleForm, ArticleId, has_placeholder};
use crate::category::{Category, CategoryError, CategoryForm, CategoryId, CategoryTree};
use crate::config::{ConfigError, SiteConfig, load_config};
use crate::gallery::{GalleryPhoto, PhotoForm, PhotoId};
use crate::imaging::{ImageBackend, RustBackend};
use crate::lifecycle::{self, HookError};
use crate::query::{self, CategoryCount, Page, QueryError, Visibility};
use crate::storage::{FileSystemStorage, MediaStorage, StorageError, delete_best_effort};
use crate::store::{Store, StoreError};
use crate::types::{Caller, ImageInput, UploadedFile};
use crate::validate::ValidationErrors;
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Login required")]
    LoginRequired,
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error("category: category {0} does not exist")]
    UnknownCategory(CategoryId),
    #[error("Category {id} cannot be deleted: {articles} article(s) still use it or its subcategories")]
    ProtectedCategory { id: CategoryId, articles: usize },
    #[error("No category with slug {0:?}")]
    CategoryNotFound(String),
    #[error("No article {0}")]
    ArticleNotFound(String),
    #[error("No photo {0}")]
    PhotoNotFound(PhotoId),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, SiteError>;

pub struct Site<S: MediaStorage, B: ImageBackend> {
    config: SiteConfig,
    store: Store,
    storage: S,
    backend: B,
    /// Where the snapshot is written after each mutation; `None` keeps
    /// everything in memory.
    data_file: Option<PathBuf>,
}

impl Site<FileSystemStorage, RustBackend> {
    /// Open the site rooted at `root`: `folio.toml`, the data file and the
    /// media directory all resolve relative to it.
    pub fn open(root: &Path) -> Result<Self> {
        let config = load_config(root)?;
        let data_file = root.join(&config.data_file);
        let store = Store::load(&data_file)?;
        let storage = FileSystemStorage::new(root.join(&config.media_root), config.media_url.clone());
        tracing::debug!(
            root = %root.display(),
            articles = store.articles.len(),
            photos = store.photos.len(),
            "opened site"
        );
        Ok(Site::new(config, store, storage, RustBackend::new()).with_data_file(data_file))
    }
}

impl<S: MediaStorage, B: ImageBackend> Site<S, B> {
    pub fn new(config: SiteConfig, store: Store, storage: S, backend: B) -> Self {
        Self {
            config,
            store,
            storage,
            backend,
            data_file: None,
        }
    }

    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Public URL of a stored file.
    pub fn media_url(&self, key: &str) -> String {
        self.storage.url(key)
    }

    fn persist(&self) -> Result<()> {
        if let Some(path) = &self.data_file {
            self.store.save(path)?;
        }
        Ok(())
    }

    fn require_staff(caller: Caller) -> Result<()> {
        if caller.is_staff() {
            Ok(())
        } else {
            Err(SiteError::LoginRequired)
        }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub fn categories(&self) -> &CategoryTree {
        &self.store.categories
    }

    pub fn create_category(&mut self, caller: Caller, form: CategoryForm) -> Result<CategoryId> {
        Self::require_staff(caller)?;
        let id = self.store.categories.insert(form)?;
        if let Err(e) = self.persist() {
            self.store.categories.delete(id)?;
            return Err(e);
        }
        tracing::info!(%id, "created category");
        Ok(id)
    }

    pub fn update_category(
        &mut self,
        caller: Caller,
        id: CategoryId,
        form: CategoryForm,
    ) -> Result<()> {
        Self::require_staff(caller)?;
        let before = self.store.categories.clone();
        self.store.categories.update(id, form)?;
        if let Err(e) = self.persist() {
            self.store.categories = before;
            return Err(e);
        }
        Ok(())
    }

    /// Delete a category and its subtree, unless an article uses any of them.
    pub fn delete_category(&mut self, caller: Caller, id: CategoryId) -> Result<Vec<Category>> {
        Self::require_staff(caller)?;
        let subtree: BTreeSet<CategoryId> =
            self.store.categories.subtree_ids(id)?.into_iter().collect();
        let articles = self
            .store
            .articles
            .values()
            .filter(|a| subtree.contains(&a.category))
            .count();
        if articles > 0 {
            return Err(SiteError::ProtectedCategory { id, articles });
        }
        let before = self.store.categories.clone();
        let removed = self.store.categories.delete(id)?;
        if let Err(e) = self.persist() {
            self.store.categories = before;
            return Err(e);
        }
        tracing::info!(%id, removed = removed.len(), "deleted category subtree");
        Ok(removed)
    }

    /// Navigation listing: every category with its published article count.
    pub fn category_counts(&self) -> Vec<CategoryCount<'_>> {
        query::category_counts(&self.store.categories, self.store.articles.values())
    }

    // =========================================================================
    // Articles
    // =========================================================================

    fn check_article(
        &self,
        form: &ArticleForm,
        thumbnail: &ImageInput,
        creating: bool,
    ) -> Result<()> {
        let mut errors = form.validate().err().unwrap_or_default();
        match thumbnail {
            ImageInput::Upload(file) => errors.check_extension(
                "thumbnail",
                file.file_name(),
                &self.config.articles.allowed_extensions,
            ),
            ImageInput::Keep if creating => errors.push("thumbnail", "this field is required"),
            ImageInput::Keep => {}
        }
        errors.into_result()?;
        if !self.store.categories.contains(form.category) {
            return Err(SiteError::UnknownCategory(form.category));
        }
        Ok(())
    }

    pub fn create_article(
        &mut self,
        caller: Caller,
        form: ArticleForm,
        thumbnail: ImageInput,
    ) -> Result<ArticleId> {
        Self::require_staff(caller)?;
        self.check_article(&form, &thumbnail, true)?;
        let slug = lifecycle::resolve_slug(
            form.explicit_slug(),
            &form.title,
            None,
            article::SLUG_MAX,
            |s| self.store.article_slug_taken(s, None),
        )?;

        let Some(prepared) = lifecycle::article_pre_save(
            &self.storage,
            &self.backend,
            &self.config,
            None,
            None,
            &thumbnail,
        )?
        else {
            return Err(ValidationErrors::single("thumbnail", "this field is required").into());
        };
        let mut changes = prepared.changes;

        let id = self.store.next_article_id();
        let now = Utc::now();
        self.store.articles.insert(
            id,
            Article {
                id,
                title: form.title,
                slug,
                short_description: form.short_description,
                full_description: form.full_description,
                thumbnail: prepared.value.clone(),
                status: form.status,
                time_create: now,
                time_update: now,
                category: form.category,
            },
        );

        let finalized = match lifecycle::article_post_create(&self.storage, id, &prepared.value) {
            Ok(finalized) => finalized,
            Err(e) => {
                self.store.articles.remove(&id);
                changes.abandon(&self.storage);
                return Err(e.into());
            }
        };
        if let Some(key) = finalized {
            // Raw row update: no pre-save hook runs here
            if let Some(row) = self.store.articles.get_mut(&id) {
                row.thumbnail = key.clone();
            }
            changes.stored = vec![key];
        }

        if let Err(e) = self.persist() {
            self.store.articles.remove(&id);
            changes.abandon(&self.storage);
            return Err(e);
        }
        changes.commit(&self.storage);
        tracing::info!(%id, "created article");
        Ok(id)
    }

    /// Update an article. With [`ImageInput::Keep`] no file is touched.
    pub fn update_article(
        &mut self,
        caller: Caller,
        id: ArticleId,
        form: ArticleForm,
        thumbnail: ImageInput,
    ) -> Result<()> {
        Self::require_staff(caller)?;
        let existing = self
            .store
            .articles
            .get(&id)
            .cloned()
            .ok_or_else(|| SiteError::ArticleNotFound(id.to_string()))?;
        self.check_article(&form, &thumbnail, false)?;
        let slug = lifecycle::resolve_slug(
            form.explicit_slug(),
            &form.title,
            Some(&existing.slug),
            article::SLUG_MAX,
            |s| self.store.article_slug_taken(s, Some(id)),
        )?;

        let prepared = lifecycle::article_pre_save(
            &self.storage,
            &self.backend,
            &self.config,
            Some(id),
            Some(&existing.thumbnail),
            &thumbnail,
        )?;
        let (mut thumbnail_key, changes) = match prepared {
            Some(p) => (p.value, p.changes),
            None => (existing.thumbnail.clone(), Default::default()),
        };

        // A thumbnail left pending by an interrupted create gets its id now
        let mut finalized: Option<(String, String)> = None;
        if has_placeholder(&thumbnail_key) {
            match lifecycle::article_post_create(&self.storage, id, &thumbnail_key) {
                Ok(Some(key)) => {
                    finalized = Some((thumbnail_key.clone(), key.clone()));
                    thumbnail_key = key;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(%id, error = %e, "could not finalize pending thumbnail"),
            }
        }

        self.store.articles.insert(
            id,
            Article {
                id,
                title: form.title,
                slug,
                short_description: form.short_description,
                full_description: form.full_description,
                thumbnail: thumbnail_key,
                status: form.status,
                time_create: existing.time_create,
                time_update: Utc::now(),
                category: form.category,
            },
        );

        if let Err(e) = self.persist() {
            // The restored row still points at the pending name
            if let Some((pending, renamed)) = &finalized {
                lifecycle::undo_rename(&self.storage, renamed, pending);
            }
            self.store.articles.insert(id, existing);
            changes.abandon(&self.storage);
            return Err(e);
        }
        let removed = changes.commit(&self.storage);
        tracing::info!(%id, removed, "updated article");
        Ok(())
    }

    /// Delete an article and its thumbnail. Deleting a missing article is
    /// not an error.
    pub fn delete_article(&mut self, caller: Caller, id: ArticleId) -> Result<Option<Article>> {
        Self::require_staff(caller)?;
        let Some(existing) = self.store.articles.remove(&id) else {
            return Ok(None);
        };
        if let Err(e) = self.persist() {
            self.store.articles.insert(id, existing);
            return Err(e);
        }
        lifecycle::article_pre_delete(&self.storage, &existing);
        tracing::info!(%id, "deleted article");
        Ok(Some(existing))
    }

    /// Articles listing: published only for anonymous callers, optionally
    /// filtered by a search term, newest first.
    pub fn list_articles(
        &self,
        caller: Caller,
        search: Option<&str>,
        page: usize,
    ) -> Result<Page<&Article>> {
        let found = query::search_articles(self.store.articles.values(), caller.into(), search);
        Ok(query::paginate(found, page, self.config.articles.per_page)?)
    }

    /// Articles filed directly under the category with `slug`.
    pub fn articles_by_category(
        &self,
        caller: Caller,
        slug: &str,
        page: usize,
    ) -> Result<(&Category, Page<&Article>)> {
        let category = self
            .store
            .categories
            .by_slug(slug)
            .ok_or_else(|| SiteError::CategoryNotFound(slug.to_string()))?;
        let in_category = self
            .store
            .articles
            .values()
            .filter(|a| a.category == category.id);
        let found = query::search_articles(in_category, caller.into(), None);
        Ok((
            category,
            query::paginate(found, page, self.config.articles.per_page)?,
        ))
    }

    /// Article detail. Drafts are only visible to staff.
    pub fn article(&self, caller: Caller, slug: &str) -> Result<&Article> {
        query::article_by_slug(self.store.articles.values(), Visibility::from(caller), slug)
            .ok_or_else(|| SiteError::ArticleNotFound(slug.to_string()))
    }

    // =========================================================================
    // Gallery
    // =========================================================================

    fn check_photo(&self, form: &PhotoForm, photo: &ImageInput) -> Result<()> {
        let mut errors = form.validate().err().unwrap_or_default();
        if let Some(file) = photo.upload() {
            errors.check_extension(
                "photo_full",
                file.file_name(),
                &self.config.gallery.allowed_extensions,
            );
        }
        Ok(errors.into_result()?)
    }

    pub fn create_photo(
        &mut self,
        caller: Caller,
        form: PhotoForm,
        photo: UploadedFile,
    ) -> Result<PhotoId> {
        Self::require_staff(caller)?;
        let photo = ImageInput::Upload(photo);
        self.check_photo(&form, &photo)?;
        let Some(prepared) = lifecycle::gallery_pre_save(
            &self.storage,
            &self.backend,
            &self.config,
            None,
            &photo,
        )?
        else {
            return Err(ValidationErrors::single("photo_full", "this field is required").into());
        };

        let id = self.store.next_photo_id();
        self.store.photos.insert(
            id,
            GalleryPhoto {
                id,
                title: form.title,
                content: form.content,
                photo_full: prepared.value.full,
                photo_compressed: Some(prepared.value.compressed),
            },
        );
        if let Err(e) = self.persist() {
            self.store.photos.remove(&id);
            prepared.changes.abandon(&self.storage);
            return Err(e);
        }
        prepared.changes.commit(&self.storage);
        tracing::info!(%id, "created gallery photo");
        Ok(id)
    }

    /// Update a photo. A new upload replaces both files.
    pub fn update_photo(
        &mut self,
        caller: Caller,
        id: PhotoId,
        form: PhotoForm,
        photo: ImageInput,
    ) -> Result<()> {
        Self::require_staff(caller)?;
        let existing = self
            .store
            .photos
            .get(&id)
            .cloned()
            .ok_or(SiteError::PhotoNotFound(id))?;
        self.check_photo(&form, &photo)?;
        let prepared = lifecycle::gallery_pre_save(
            &self.storage,
            &self.backend,
            &self.config,
            Some(&existing),
            &photo,
        )?;

        let mut row = GalleryPhoto {
            title: form.title,
            content: form.content,
            ..existing.clone()
        };
        let changes = match prepared {
            Some(p) => {
                row.photo_full = p.value.full;
                row.photo_compressed = Some(p.value.compressed);
                p.changes
            }
            None => Default::default(),
        };
        self.store.photos.insert(id, row);

        if let Err(e) = self.persist() {
            self.store.photos.insert(id, existing);
            changes.abandon(&self.storage);
            return Err(e);
        }
        let removed = changes.commit(&self.storage);
        tracing::info!(%id, removed, "updated gallery photo");
        Ok(())
    }

    /// Delete a photo and both of its files. Deleting a missing photo is not
    /// an error.
    pub fn delete_photo(&mut self, caller: Caller, id: PhotoId) -> Result<Option<GalleryPhoto>> {
        Self::require_staff(caller)?;
        let Some(existing) = self.store.photos.remove(&id) else {
            return Ok(None);
        };
        if let Err(e) = self.persist() {
            self.store.photos.insert(id, existing);
            return Err(e);
        }
        lifecycle::gallery_pre_delete(&self.storage, &existing);
        tracing::info!(%id, "deleted gallery photo");
        Ok(Some(existing))
    }

    /// Gallery page, newest photo first.
    pub fn list_photos(&self, page: usize) -> Result<Page<&GalleryPhoto>> {
        let photos: Vec<&GalleryPhoto> = self.store.photos.values().rev().collect();
        Ok(query::paginate(photos, page, self.config.gallery.per_page)?)
    }

    pub fn photo(&self, id: PhotoId) -> Result<&GalleryPhoto> {
        self.store.photos.get(&id).ok_or(SiteError::PhotoNotFound(id))
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Stored files no row refers to.
    pub fn orphaned_media(&self) -> Result<Vec<String>> {
        let referenced: BTreeSet<&str> = self.store.referenced_keys().into_iter().collect();
        Ok(self
            .storage
            .keys()?
            .into_iter()
            .filter(|key| !referenced.contains(key.as_str()))
            .collect())
    }

    /// Delete every orphaned file. Returns the keys actually removed.
    pub fn remove_orphans(&self, caller: Caller) -> Result<Vec<String>> {
        Self::require_staff(caller)?;
        Ok(self
            .orphaned_media()?
            .into_iter()
            .filter(|key| delete_best_effort(&self.storage, key))
            .collect())
    }
}
