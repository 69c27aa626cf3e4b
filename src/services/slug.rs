//! URL slug generation
//!
//! Turns free text such as adventure titles into `[a-z0-9-]` tokens.
//! German umlauts lose their diaeresis (`ä` → `a`) and `ß` becomes `ss`.

use unicode_normalization::UnicodeNormalization;

/// Generate a URL-safe slug from arbitrary text.
///
/// Lowercases, maps `ß` to `ss`, decomposes with NFKD and drops whatever is
/// still non-ASCII afterwards. Every run of characters outside `[a-z0-9]`
/// collapses into one hyphen; leading and trailing hyphens are removed.
///
/// ```ignore
/// use sattl::services::slug::generate_slug;
///
/// assert_eq!(generate_slug("Schwäbische Alb"), "schwabische-alb");
/// assert_eq!(generate_slug("---"), "");
/// ```
pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase().replace('ß', "ss");

    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for c in lowered.nfkd() {
        if !c.is_ascii() {
            continue;
        }
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_umlauts_and_eszett() {
        assert_eq!(generate_slug("Schwäbische Alb"), "schwabische-alb");
        assert_eq!(generate_slug("Straße"), "strasse");
        assert_eq!(generate_slug("Über die Höhen"), "uber-die-hohen");
        assert_eq!(generate_slug("Crème brûlée"), "creme-brulee");
    }

    #[test]
    fn test_punctuation_and_whitespace() {
        assert_eq!(generate_slug("  Hello,  World!! "), "hello-world");
        assert_eq!(generate_slug("a_b.c"), "a-b-c");
        assert_eq!(generate_slug("Tag 3: 120km / 1500hm"), "tag-3-120km-1500hm");
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(generate_slug("---"), "");
        assert_eq!(generate_slug(""), "");
        assert_eq!(generate_slug("日本語"), "");
        assert_eq!(generate_slug("🚲 Tour 🚲"), "tour");
    }

    #[test]
    fn test_non_ascii_is_dropped_not_hyphenated() {
        assert_eq!(generate_slug("a€b"), "ab");
    }

    #[test]
    fn test_already_slugged_is_unchanged() {
        assert_eq!(generate_slug("donau-radweg-2025"), "donau-radweg-2025");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn property_slug_is_idempotent(text in "\\PC{0,40}") {
            let once = generate_slug(&text);
            prop_assert_eq!(generate_slug(&once), once);
        }

        #[test]
        fn property_slug_charset(text in "\\PC{0,40}") {
            let slug = generate_slug(&text);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
