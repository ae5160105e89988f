//! Hierarchical article categories.
//!
//! Categories form a forest through parent pointers. Nothing about the
//! display order is stored: siblings are sorted by title and the indented
//! depth-first listing is recomputed on every read, so inserts and moves only
//! ever touch the node itself.
//!
//! ```text
//! Travel            depth 0
//!     Italy         depth 1
//!     Japan         depth 1
//!         Kyoto     depth 2
//! Work              depth 0
//! ```
//!
//! ## Invariants
//!
//! - No cycles: a node can never become its own ancestor. Such a move is
//!   rejected with [`CategoryError::Cycle`] and the tree is left untouched.
//! - Slugs are unique across the whole tree.
//! - Deleting a node deletes its entire subtree.

use crate::slug::{is_valid_slug, unique_slugify};
use crate::validate::ValidationErrors;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const TITLE_MAX: usize = 20;
pub const SLUG_MAX: usize = 20;
pub const DESCRIPTION_MAX: usize = 100;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum CategoryError {
    #[error("Invalid category: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("Category {0} does not exist")]
    NotFound(CategoryId),
    #[error("parent: category {0} does not exist")]
    UnknownParent(CategoryId),
    #[error("parent: a category cannot be placed under itself or one of its descendants")]
    Cycle,
    #[error("slug: category with slug {0:?} already exists")]
    DuplicateSlug(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub parent: Option<CategoryId>,
}

/// Editable fields of a category.
///
/// A `None` slug is derived from the title on insert and left unchanged on
/// update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryForm {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
    pub parent: Option<CategoryId>,
}

/// One row of the indented display listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeEntry {
    pub depth: usize,
    pub id: CategoryId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryTree {
    next_id: u64,
    nodes: BTreeMap<CategoryId, Category>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn by_slug(&self, slug: &str) -> Option<&Category> {
        self.nodes.values().find(|c| c.slug == slug)
    }

    /// All categories in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.nodes.values()
    }

    /// Add a category and return its id.
    pub fn insert(&mut self, form: CategoryForm) -> Result<CategoryId, CategoryError> {
        let slug = self.check_form(&form, None)?;
        self.next_id += 1;
        let id = CategoryId(self.next_id);
        self.nodes.insert(
            id,
            Category {
                id,
                title: form.title,
                slug,
                description: form.description,
                parent: form.parent,
            },
        );
        Ok(id)
    }

    /// Replace a category's fields, possibly moving it under a new parent.
    pub fn update(&mut self, id: CategoryId, form: CategoryForm) -> Result<(), CategoryError> {
        let slug = self.check_form(&form, Some(id))?;
        let node = self.nodes.get_mut(&id).ok_or(CategoryError::NotFound(id))?;
        node.title = form.title;
        node.slug = slug;
        node.description = form.description;
        node.parent = form.parent;
        Ok(())
    }

    /// Change only the parent of `id`.
    pub fn move_to(
        &mut self,
        id: CategoryId,
        parent: Option<CategoryId>,
    ) -> Result<(), CategoryError> {
        let current = self.get(id).ok_or(CategoryError::NotFound(id))?;
        let form = CategoryForm {
            title: current.title.clone(),
            slug: Some(current.slug.clone()),
            description: current.description.clone(),
            parent,
        };
        self.update(id, form)
    }

    /// Remove `id` and its whole subtree, returning the removed categories
    /// in depth-first order (the node itself first).
    pub fn delete(&mut self, id: CategoryId) -> Result<Vec<Category>, CategoryError> {
        let ids = self.subtree_ids(id)?;
        Ok(ids
            .into_iter()
            .filter_map(|id| self.nodes.remove(&id))
            .collect())
    }

    /// `id` followed by all of its descendants, depth-first.
    pub fn subtree_ids(&self, id: CategoryId) -> Result<Vec<CategoryId>, CategoryError> {
        if !self.contains(id) {
            return Err(CategoryError::NotFound(id));
        }
        let mut out = vec![id];
        self.collect_descendants(id, &mut out);
        Ok(out)
    }

    /// Direct children of `parent` (roots for `None`), ordered by title.
    pub fn children(&self, parent: Option<CategoryId>) -> Vec<&Category> {
        let mut kids: Vec<&Category> = self.nodes.values().filter(|c| c.parent == parent).collect();
        kids.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });
        kids
    }

    pub fn roots(&self) -> Vec<&Category> {
        self.children(None)
    }

    /// Ancestors of `id`, nearest first. Empty for roots and unknown ids.
    pub fn ancestors(&self, id: CategoryId) -> Vec<&Category> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|c| c.parent);
        while let Some(parent_id) = cursor {
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            // A corrupt snapshot could still contain a loop
            if out.iter().any(|c: &&Category| c.id == parent.id) {
                break;
            }
            out.push(parent);
            cursor = parent.parent;
        }
        out
    }

    /// All descendants of `id`, depth-first, siblings by title.
    pub fn descendants(&self, id: CategoryId) -> Vec<&Category> {
        let mut ids = Vec::new();
        self.collect_descendants(id, &mut ids);
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// The whole forest flattened depth-first with indentation depths.
    pub fn display_order(&self) -> Vec<TreeEntry> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<TreeEntry> = self
            .roots()
            .into_iter()
            .rev()
            .map(|c| TreeEntry { depth: 0, id: c.id })
            .collect();
        while let Some(entry) = stack.pop() {
            if out.iter().any(|e: &TreeEntry| e.id == entry.id) {
                continue;
            }
            out.push(entry);
            stack.extend(self.children(Some(entry.id)).into_iter().rev().map(|c| TreeEntry {
                depth: entry.depth + 1,
                id: c.id,
            }));
        }
        out
    }

    /// Whether making `parent` the parent of `id` would close a loop.
    pub fn would_cycle(&self, id: CategoryId, parent: CategoryId) -> bool {
        parent == id || self.ancestors(parent).iter().any(|c| c.id == id)
    }

    pub fn slug_taken(&self, slug: &str, except: Option<CategoryId>) -> bool {
        self.nodes
            .values()
            .any(|c| c.slug == slug && Some(c.id) != except)
    }

    fn collect_descendants(&self, id: CategoryId, out: &mut Vec<CategoryId>) {
        for child in self.children(Some(id)) {
            if out.contains(&child.id) {
                continue;
            }
            out.push(child.id);
            self.collect_descendants(child.id, out);
        }
    }

    /// Validate a form against the tree and return the slug to store.
    fn check_form(
        &self,
        form: &CategoryForm,
        id: Option<CategoryId>,
    ) -> Result<String, CategoryError> {
        let mut errors = ValidationErrors::new();
        errors.check_text("title", &form.title, TITLE_MAX);
        errors.check_text("description", &form.description, DESCRIPTION_MAX);
        let explicit = form.slug.as_deref().filter(|s| !s.is_empty());
        if let Some(slug) = explicit {
            errors.check_max_chars("slug", slug, SLUG_MAX);
            if !is_valid_slug(slug) {
                errors.push(
                    "slug",
                    "enter a valid slug of lowercase letters, numbers, underscores or hyphens",
                );
            }
        }
        errors.into_result()?;

        if let Some(id) = id
            && !self.contains(id)
        {
            return Err(CategoryError::NotFound(id));
        }
        if let Some(parent) = form.parent {
            if !self.contains(parent) {
                return Err(CategoryError::UnknownParent(parent));
            }
            if let Some(id) = id
                && self.would_cycle(id, parent)
            {
                return Err(CategoryError::Cycle);
            }
        }

        match (explicit, id) {
            (Some(slug), _) => {
                if self.slug_taken(slug, id) {
                    return Err(CategoryError::DuplicateSlug(slug.to_string()));
                }
                Ok(slug.to_string())
            }
            (None, Some(id)) => Ok(self.nodes[&id].slug.clone()),
            (None, None) => Ok(unique_slugify(
                |s| self.slug_taken(s, None),
                &form.title,
                SLUG_MAX,
            )),
        }
    }
}
