//! URL slugs derived from titles.
//!
//! Titles are transliterated to ASCII first (`"Привет"` → `"privet"`),
//! so a site written in any script still gets readable URLs. Only slugs the
//! system derives itself are made unique; a slug typed in by an editor that
//! collides is a validation error, not something to paper over.

/// Length of the random disambiguation suffix, in hex characters.
pub const SUFFIX_LEN: usize = 8;

/// Transliterate `text` into a lowercase, dash-separated slug of at most
/// `max_len` characters.
///
/// Truncation never leaves a trailing dash. Returns an empty string if the
/// text has nothing sluggable in it (e.g. only punctuation).
pub fn slugify(text: &str, max_len: usize) -> String {
    truncate(&::slug::slugify(text), max_len)
}

/// Derive a slug from `text` that `exists` reports as free.
///
/// Without a collision this is exactly [`slugify`]. On a collision, `-` plus
/// an 8-character random hex suffix is appended (the base is shortened so the
/// result still fits `max_len`) and the lookup is repeated until it reports
/// the candidate free. An empty base counts as a collision and yields the bare
/// suffix.
///
/// ```
/// # use folio::slug::unique_slugify;
/// let taken = ["travel"];
/// assert_eq!(unique_slugify(|s| taken.contains(&s), "Work", 20), "work");
///
/// let other = unique_slugify(|s| taken.contains(&s), "Travel", 20);
/// assert!(other.starts_with("travel-"));
/// assert_eq!(other.len(), "travel-".len() + 8);
/// ```
pub fn unique_slugify(exists: impl Fn(&str) -> bool, text: &str, max_len: usize) -> String {
    unique_slugify_with(exists, text, max_len, random_suffix)
}

/// [`unique_slugify`] with an injectable suffix source.
pub(crate) fn unique_slugify_with(
    exists: impl Fn(&str) -> bool,
    text: &str,
    max_len: usize,
    mut suffix: impl FnMut() -> String,
) -> String {
    let base = slugify(text, max_len);
    if !base.is_empty() && !exists(&base) {
        return base;
    }

    // Room left for the base once "-xxxxxxxx" is appended
    let room = max_len.saturating_sub(SUFFIX_LEN + 1);
    let short_base = truncate(&base, room);
    loop {
        let tail = suffix();
        let candidate = if short_base.is_empty() {
            tail
        } else {
            format!("{short_base}-{tail}")
        };
        if !exists(&candidate) {
            return candidate;
        }
        tracing::debug!(%candidate, "slug suffix collided, retrying");
    }
}

/// Whether an editor-supplied slug is acceptable as-is.
///
/// Lowercase ASCII letters, digits, `-` and `_`; non-empty.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn random_suffix() -> String {
    format!("{:08x}", rand::random::<u32>())
}

fn truncate(slug: &str, max_len: usize) -> String {
    // slugs are ASCII, so byte and char positions agree
    let cut = &slug[..slug.len().min(max_len)];
    cut.trim_end_matches('-').to_string()
}
