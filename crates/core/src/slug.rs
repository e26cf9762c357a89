//! URL slugs for products and collections.

/// Turn a title into a URL slug.
///
/// ASCII letters and digits are kept (lower-cased); every other run of
/// characters becomes a single hyphen, and leading/trailing hyphens are
/// dropped.
///
/// ```
/// use shopfront_core::slug::slugify;
///
/// assert_eq!(slugify("Summer Linen Shirt"), "summer-linen-shirt");
/// assert_eq!(slugify("  50% Off -- Socks! "), "50-off-socks");
/// ```
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Whether a string is already a well-formed slug.
#[must_use]
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty() && slugify(s) == s
}
