use std::borrow::Cow;

pub const ELLIPSIS: &str = "...";

/// Trims `string` and replaces every run of whitespace with a single space.
///
/// ```
/// use warbler::util::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
/// assert_eq!(collapse_whitespace("plain"), "plain");
/// ```
pub fn collapse_whitespace(string: &str) -> Cow<'_, str> {
    let trimmed = string.trim();
    let mut previous_space = false;
    let already_collapsed = trimmed.chars().all(|c| {
        let ok = c == ' ' && !previous_space || !c.is_whitespace();
        previous_space = c.is_whitespace();
        ok
    });

    if already_collapsed {
        return Cow::Borrowed(trimmed);
    }

    Cow::Owned(trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Shortens `string` to at most `max` characters, the last three of which are
/// `...` when anything was cut. Never splits a character.
///
/// ```
/// use warbler::util::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("short", 10), "short");
/// assert_eq!(truncate_with_ellipsis("a longer sentence", 10), "a longe...");
/// assert_eq!(truncate_with_ellipsis("ééééééé", 6), "ééé...");
/// ```
pub fn truncate_with_ellipsis(string: &str, max: usize) -> Cow<'_, str> {
    if string.chars().count() <= max {
        return Cow::Borrowed(string);
    }

    let keep = max.saturating_sub(ELLIPSIS.len());
    let cut = string.char_indices().nth(keep).map_or(string.len(), |(i, _)| i);
    Cow::Owned(format!("{}{ELLIPSIS}", string[..cut].trim_end()))
}

/// Turns a file name like `deep_learning-intro.png` into `Deep Learning Intro`.
///
/// ```
/// use warbler::util::title_words;
///
/// assert_eq!(title_words("img/deep_learning-intro.v2.png"), "Deep Learning Intro");
/// assert_eq!(title_words("https://cdn.example.com/a/LOGO.svg?x=1"), "Logo");
/// assert_eq!(title_words("/"), "");
/// ```
pub fn title_words(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let name = path.rsplit(['/', '\\']).next().unwrap_or("");
    let stem = name.split('.').next().unwrap_or("");
    stem.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            let first = chars.next().map(|c| c.to_uppercase().collect::<String>());
            first.unwrap_or_default() + &chars.as_str().to_lowercase()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `haystack` contains `needle`, ignoring ASCII case.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_bounded_and_stable() {
        for max in 3..40 {
            let text = "The quick brown fox jumps over the lazy dog";
            let once = truncate_with_ellipsis(text, max);
            assert!(once.chars().count() <= max, "{once:?} > {max}");
            assert_eq!(truncate_with_ellipsis(&once, max), once);
        }
    }

    #[test]
    fn collapse_borrows_when_possible() {
        assert!(matches!(collapse_whitespace(" a b "), Cow::Borrowed("a b")));
        assert!(matches!(collapse_whitespace("a  b"), Cow::Owned(_)));
    }
}
