//! URL slug generation.

/// Turn an arbitrary title into a URL-safe slug.
///
/// Lowercases ASCII, maps runs of non-alphanumeric characters to single
/// hyphens, and trims leading/trailing hyphens. Non-ASCII characters are
/// dropped, so callers should fall back to an ID-based slug when the result
/// is empty (e.g., for fully Arabic titles).
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("The Art of Law"), "the-art-of-law");
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Droit -- civil (2nd ed.)"), "droit-civil-2nd-ed");
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("  hello  "), "hello");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("café 101"), "caf-101");
        assert_eq!(slugify("كتاب"), "");
    }
}
