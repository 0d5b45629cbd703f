//! URL slugs derived from display names.

/// Derive a URL-safe slug from a display name.
///
/// Runs of whitespace become a single `-`, characters outside the unreserved
/// URL set (`A-Z a-z 0-9 - _ . ~`) are dropped, and case is preserved.
/// Leading and trailing separators are trimmed. Distinct names may produce the
/// same slug; callers must not rely on slug uniqueness.
///
/// ```
/// use ecommerce_core::slugify;
///
/// assert_eq!(slugify("Summer  Shirts!"), "Summer-Shirts");
/// assert_eq!(slugify("  tea & coffee "), "tea-coffee");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = !slug.is_empty();
        } else if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '~') {
            if pending_dash {
                slug.push('-');
                pending_dash = false;
            }
            slug.push(c);
        }
    }

    slug
}
