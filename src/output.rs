//! CLI output formatting.
//!
//! Every listing is a header line followed by indented context lines, the
//! same shape for categories, articles and photos.
//!
//! # Output Format
//!
//! ## Categories
//!
//! ```text
//! Categories
//! #1 Travel [travel] (2 published)
//!     #3 Italy [italy] (0 published)
//!     #2 Japan [japan] (1 published)
//! ```
//!
//! ## Articles
//!
//! ```text
//! Articles (page 1 of 2, 7 total)
//! #7 Kyoto in autumn [published]
//!     Slug: kyoto-in-autumn
//!     Category: Travel / Japan
//!     Created: 2024-05-01 12:00
//!     Thumbnail: /media/articles/Thmb.7.dawn_compressed.webp
//! ```
//!
//! ## Gallery
//!
//! ```text
//! Gallery (page 1 of 1, 2 total)
//! #2 Dusk
//!     Caption: Over the bay
//!     Full: /media/gallery/dusk.jpg
//!     Compressed: /media/gallery/dusk_compressed.webp
//! ```
//!
//! # Architecture
//!
//! Each listing has a `format_*` function (returns `Vec<String>`) for
//! testability and is printed with [`print_lines`]. Format functions are
//! pure: no I/O, no side effects.

use crate::article::Article;
use crate::category::{CategoryId, CategoryTree};
use crate::gallery::GalleryPhoto;
use crate::query::{CategoryCount, Page};

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn page_header<T>(label: &str, page: &Page<T>) -> String {
    format!(
        "{label} (page {} of {}, {} total)",
        page.number, page.num_pages, page.total
    )
}

fn page_footer<T>(page: &Page<T>, lines: &mut Vec<String>) {
    if page.has_next() {
        lines.push(format!("More: --page {}", page.number + 1));
    }
}

/// `Travel / Japan` style path from the root down to `id`.
fn category_path(tree: &CategoryTree, id: CategoryId) -> String {
    let Some(category) = tree.get(id) else {
        return format!("#{id} (deleted)");
    };
    let mut parts: Vec<&str> = tree
        .ancestors(id)
        .iter()
        .rev()
        .map(|c| c.title.as_str())
        .collect();
    parts.push(&category.title);
    parts.join(" / ")
}

// ============================================================================
// Categories
// ============================================================================

pub fn format_category_tree(counts: &[CategoryCount<'_>]) -> Vec<String> {
    let mut lines = vec!["Categories".to_string()];
    if counts.is_empty() {
        lines.push("    (none)".to_string());
    }
    for entry in counts {
        lines.push(format!(
            "{}#{} {} [{}] ({} published)",
            indent(entry.depth),
            entry.category.id,
            entry.category.title,
            entry.category.slug,
            entry.published
        ));
    }
    lines
}

// ============================================================================
// Articles
// ============================================================================

fn article_lines(
    article: &Article,
    tree: &CategoryTree,
    thumbnail_url: &str,
    lines: &mut Vec<String>,
) {
    lines.push(format!("#{} {} [{}]", article.id, article.title, article.status));
    lines.push(format!("    Slug: {}", article.slug));
    lines.push(format!("    Category: {}", category_path(tree, article.category)));
    lines.push(format!(
        "    Created: {}",
        article.time_create.format("%Y-%m-%d %H:%M")
    ));
    if article.time_update != article.time_create {
        lines.push(format!(
            "    Updated: {}",
            article.time_update.format("%Y-%m-%d %H:%M")
        ));
    }
    lines.push(format!("    Thumbnail: {thumbnail_url}"));
}

/// One page of articles. `url` maps a storage key to its public URL.
pub fn format_article_list(
    page: &Page<&Article>,
    tree: &CategoryTree,
    url: impl Fn(&str) -> String,
) -> Vec<String> {
    let mut lines = vec![page_header("Articles", page)];
    if page.items.is_empty() {
        lines.push("    (none)".to_string());
    }
    for article in &page.items {
        article_lines(article, tree, &url(&article.thumbnail), &mut lines);
        let summary = truncate_desc(&article.short_description, 60);
        if !summary.is_empty() {
            lines.push(format!("    {summary}"));
        }
    }
    page_footer(page, &mut lines);
    lines
}

/// Full article view: metadata followed by the plain-text body.
pub fn format_article_detail(
    article: &Article,
    tree: &CategoryTree,
    thumbnail_url: &str,
) -> Vec<String> {
    let mut lines = Vec::new();
    article_lines(article, tree, thumbnail_url, &mut lines);
    lines.push(String::new());
    lines.push(article.short_description.clone());
    lines.push(String::new());
    lines.extend(
        strip_html_tags(&article.full_description)
            .lines()
            .map(str::to_string),
    );
    lines
}

// ============================================================================
// Gallery
// ============================================================================

pub fn format_photo_list(page: &Page<&GalleryPhoto>, url: impl Fn(&str) -> String) -> Vec<String> {
    let mut lines = vec![page_header("Gallery", page)];
    if page.items.is_empty() {
        lines.push("    (none)".to_string());
    }
    for photo in &page.items {
        lines.push(format!("#{} {}", photo.id, photo.title));
        lines.push(format!("    Caption: {}", photo.content));
        lines.push(format!("    Full: {}", url(&photo.photo_full)));
        match &photo.photo_compressed {
            Some(key) => lines.push(format!("    Compressed: {}", url(key))),
            None => lines.push("    Compressed: (missing)".to_string()),
        }
    }
    page_footer(page, &mut lines);
    lines
}

// ============================================================================
// Maintenance
// ============================================================================

pub fn format_orphans(keys: &[String], removed: bool) -> Vec<String> {
    if keys.is_empty() {
        return vec!["No orphaned media".to_string()];
    }
    let verb = if removed { "Removed" } else { "Orphaned" };
    let mut lines = vec![format!("{verb} media ({} files)", keys.len())];
    lines.extend(keys.iter().map(|k| format!("    {k}")));
    lines
}

/// Print formatted lines to stdout.
pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
