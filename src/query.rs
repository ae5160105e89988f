//! Read-side queries: visibility, search, ordering and pagination.

use crate::article::Article;
use crate::category::{Category, CategoryTree};
use crate::types::Caller;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("Page {page} is out of range (1-{num_pages})")]
    PageOutOfRange { page: usize, num_pages: usize },
    #[error("Page size must be at least 1")]
    InvalidPageSize,
}

/// Which rows a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Published articles only.
    Public,
    /// Everything, drafts included.
    Staff,
}

impl From<Caller> for Visibility {
    fn from(caller: Caller) -> Self {
        if caller.is_staff() {
            Visibility::Staff
        } else {
            Visibility::Public
        }
    }
}

impl Visibility {
    pub fn can_see(self, article: &Article) -> bool {
        self == Visibility::Staff || article.is_published()
    }
}

/// Articles visible under `visibility`, filtered by an optional search term,
/// newest first.
///
/// The search is a case-insensitive substring match against the title, the
/// slug or the full description; any one matching is enough. A blank term
/// matches everything.
pub fn search_articles<'a>(
    articles: impl IntoIterator<Item = &'a Article>,
    visibility: Visibility,
    search: Option<&str>,
) -> Vec<&'a Article> {
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let mut found: Vec<&Article> = articles
        .into_iter()
        .filter(|a| visibility.can_see(a))
        .filter(|a| needle.as_deref().is_none_or(|n| matches_search(a, n)))
        .collect();
    sort_newest_first(&mut found);
    found
}

fn matches_search(article: &Article, needle: &str) -> bool {
    [&article.title, &article.slug, &article.full_description]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Newest `time_create` first; the higher id wins a tie.
pub fn sort_newest_first(articles: &mut [&Article]) {
    articles.sort_by(|a, b| {
        b.time_create
            .cmp(&a.time_create)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub number: usize,
    pub num_pages: usize,
    /// Total items across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Cut page `page` (1-based) of `per_page` items out of `items`.
///
/// An empty list still has a page 1.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Result<Page<T>, QueryError> {
    if per_page == 0 {
        return Err(QueryError::InvalidPageSize);
    }
    let total = items.len();
    let num_pages = total.div_ceil(per_page).max(1);
    if page == 0 || page > num_pages {
        return Err(QueryError::PageOutOfRange { page, num_pages });
    }
    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();
    Ok(Page {
        items,
        number: page,
        num_pages,
        total,
    })
}

/// A category and how many published articles sit directly in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount<'a> {
    pub depth: usize,
    pub category: &'a Category,
    pub published: usize,
}

/// Every category in display order with its published article count.
pub fn category_counts<'a>(
    tree: &'a CategoryTree,
    articles: impl IntoIterator<Item = &'a Article> + Clone,
) -> Vec<CategoryCount<'a>> {
    tree.display_order()
        .into_iter()
        .filter_map(|entry| {
            let category = tree.get(entry.id)?;
            let published = articles
                .clone()
                .into_iter()
                .filter(|a| a.is_published() && a.category == entry.id)
                .count();
            Some(CategoryCount {
                depth: entry.depth,
                category,
                published,
            })
        })
        .collect()
}

/// Find an article by slug if `visibility` allows it.
pub fn article_by_slug<'a>(
    articles: impl IntoIterator<Item = &'a Article>,
    visibility: Visibility,
    slug: &str,
) -> Option<&'a Article> {
    articles
        .into_iter()
        .find(|a| a.slug == slug && visibility.can_see(a))
}
