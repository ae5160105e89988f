//! Article rows, their editable form, and thumbnail key naming.
//!
//! A thumbnail is stored before the article row exists, so its key cannot
//! contain the article id yet. It is written as
//! `"{upload_dir}/Thmb.id_to_replace.{name}"` and renamed to
//! `"{upload_dir}/Thmb.{id}.{name}"` once the row has an id. Only the file
//! name component is ever rewritten.

use crate::category::CategoryId;
use crate::slug::is_valid_slug;
use crate::validate::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TITLE_MAX: usize = 50;
pub const SLUG_MAX: usize = 55;
pub const SHORT_DESCRIPTION_MAX: usize = 500;

/// Stand-in for the article id in a thumbnail key written before the row exists.
pub const PLACEHOLDER_TOKEN: &str = "id_to_replace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub u64);

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    #[default]
    Published,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Draft => write!(f, "draft"),
            Status::Published => write!(f, "published"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub full_description: String,
    /// Storage key of the compressed thumbnail.
    pub thumbnail: String,
    pub status: Status,
    pub time_create: DateTime<Utc>,
    pub time_update: DateTime<Utc>,
    pub category: CategoryId,
}

impl Article {
    pub fn is_published(&self) -> bool {
        self.status == Status::Published
    }
}

/// Editable, non-image fields of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleForm {
    pub title: String,
    /// `None` or empty: derived from the title on create, kept on update.
    pub slug: Option<String>,
    pub short_description: String,
    pub full_description: String,
    pub status: Status,
    pub category: CategoryId,
}

impl ArticleForm {
    /// Field-level checks that need nothing but the form itself.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_text("title", &self.title, TITLE_MAX);
        errors.check_text(
            "short_description",
            &self.short_description,
            SHORT_DESCRIPTION_MAX,
        );
        if self.full_description.trim().is_empty() {
            errors.push("full_description", "this field is required");
        }
        if let Some(slug) = self.explicit_slug() {
            errors.check_max_chars("slug", slug, SLUG_MAX);
            if !is_valid_slug(slug) {
                errors.push(
                    "slug",
                    "enter a valid slug of lowercase letters, numbers, underscores or hyphens",
                );
            }
        }
        errors.into_result()
    }

    /// The slug typed by the editor, if any.
    pub fn explicit_slug(&self) -> Option<&str> {
        self.slug.as_deref().filter(|s| !s.is_empty())
    }
}

/// Storage key for a thumbnail named `derived_name`, tagged with `token`.
///
/// ```
/// # use folio::article::{thumbnail_key, PLACEHOLDER_TOKEN};
/// assert_eq!(
///     thumbnail_key("articles", PLACEHOLDER_TOKEN, "dawn_compressed.webp"),
///     "articles/Thmb.id_to_replace.dawn_compressed.webp"
/// );
/// ```
pub fn thumbnail_key(upload_dir: &str, token: &str, derived_name: &str) -> String {
    let dir = upload_dir.trim_end_matches('/');
    if dir.is_empty() {
        format!("Thmb.{token}.{derived_name}")
    } else {
        format!("{dir}/Thmb.{token}.{derived_name}")
    }
}

fn split_file_name(key: &str) -> (&str, &str) {
    match key.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", key),
    }
}

const THUMBNAIL_PREFIX: &str = "Thmb.";

/// File name after the `Thmb.<token>.` prefix, if it carries exactly that
/// prefix.
fn strip_token<'a>(file: &'a str, token: &str) -> Option<&'a str> {
    file.strip_prefix(THUMBNAIL_PREFIX)?
        .strip_prefix(token)?
        .strip_prefix('.')
}

/// Whether the key's file name still starts with `Thmb.<placeholder>.`.
///
/// The token anywhere else in the key (a directory, or the uploaded file's
/// own name) does not count.
pub fn has_placeholder(key: &str) -> bool {
    strip_token(split_file_name(key).1, PLACEHOLDER_TOKEN).is_some()
}

/// The key with its `Thmb.<placeholder>.` prefix rewritten to `Thmb.<id>.`,
/// or `None` if the file name does not start with that prefix.
pub fn finalize_thumbnail_key(key: &str, id: ArticleId) -> Option<String> {
    let (dir, file) = split_file_name(key);
    let rest = strip_token(file, PLACEHOLDER_TOKEN)?;
    Some(thumbnail_key(dir, &id.to_string(), rest))
}
