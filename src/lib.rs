//! # Folio
//!
//! Content management for a personal portfolio: a blog of articles filed in
//! a category tree, and a photo gallery. Every uploaded image is compressed
//! to a fixed width when a row is saved, and stored files follow their rows
//! through replacement and deletion.
//!
//! # Architecture: Rows and Files
//!
//! A save touches two places that cannot share a transaction: the JSON
//! snapshot holding the rows, and the media directory holding the files.
//! Every mutation runs the same sequence:
//!
//! ```text
//! 1. Validate   form + upload      →  field errors, nothing touched
//! 2. Pre-save   upload             →  new files stored, old ones noted
//! 3. Persist    row                →  folio.json rewritten
//! 4. Commit     noted files        →  superseded files deleted
//! ```
//!
//! If step 3 fails the new files are deleted instead and the old row stays
//! intact. A file is never deleted while a row still points to it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`site`] | Entry point: every create/update/delete/list operation |
//! | [`lifecycle`] | Pre-save, post-create and pre-delete hooks for image fields |
//! | [`category`] | Arena-backed category tree with cycle checks and cascade delete |
//! | [`article`] | Article rows, forms and thumbnail key naming |
//! | [`gallery`] | Gallery photo rows and forms |
//! | [`query`] | Visibility, search, ordering and pagination |
//! | [`store`] | JSON snapshot of all rows |
//! | [`storage`] | [`MediaStorage`](storage::MediaStorage) trait + filesystem implementation |
//! | [`imaging`] | Pure-Rust resize and re-encode of uploads |
//! | [`slug`] | Slug generation with random collision suffixes |
//! | [`validate`] | Field-level form validation |
//! | [`config`] | `folio.toml` loading, merging and validation |
//! | [`types`] | Uploads, image inputs and callers |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Storage Never Overwrites
//!
//! Saving under a key that already exists picks an alternate key with a
//! random suffix, so two uploads named `dawn.jpg` never clobber each other.
//! Hooks always use the key the storage returns.
//!
//! ## Thumbnails Named After Their Row
//!
//! An article thumbnail is stored as `Thmb.<id>.<name>`. On create the id is
//! unknown until the row exists, so the file is first stored under a
//! placeholder token and renamed right after the row is written.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resizing and encoding all go through the `image`
//! crate. No ImageMagick or other system library is needed at build or run
//! time; the binary is self-contained.
//!
//! ## Hooks Are Plain Functions
//!
//! Lifecycle hooks take the storage, backend and config as arguments and
//! return the file changes they want made. [`site::Site`] decides when to
//! commit or abandon them, which keeps every hook testable against the
//! in-memory doubles.

pub mod article;
pub mod category;
pub mod config;
pub mod gallery;
pub mod imaging;
pub mod lifecycle;
pub mod output;
pub mod query;
pub mod site;
pub mod slug;
pub mod storage;
pub mod store;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
