use std::borrow::Cow;

/// Collapses runs of whitespace into single spaces and trims both ends.
///
/// Returns `Cow::Borrowed` when the input is already collapsed.
pub fn collapse_whitespace(s: &str) -> Cow<'_, str> {
    let trimmed = s.trim();
    let mut prev_space = false;
    let clean = trimmed.chars().all(|c| {
        let ok = if c.is_whitespace() {
            c == ' ' && !prev_space
        } else {
            true
        };
        prev_space = c.is_whitespace();
        ok
    });

    if clean {
        return Cow::Borrowed(trimmed);
    }

    Cow::Owned(trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Transliterates text to its closest ASCII spelling ("São" becomes "Sao",
/// "Москва" becomes "Moskva").
///
/// Characters with no transliteration are dropped. ASCII input is returned
/// borrowed.
pub fn ascii_fold(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(deunicode::deunicode_with_tofu(s, ""))
}

/// Normalizes text for the full-text index: ASCII-folds, replaces
/// everything but letters with spaces and collapses whitespace.
///
/// ```
/// use datahtml::util::norm_words;
///
/// assert_eq!(norm_words("Economía: ¡año 2024!"), "Economia ano");
/// ```
pub fn norm_words(text: &str) -> String {
    let folded = ascii_fold(text);
    let letters: String = folded
        .chars()
        .map(|c| if c.is_ascii_alphabetic() { c } else { ' ' })
        .collect();
    collapse_whitespace(&letters).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_clean_returns_borrowed() {
        let result = collapse_whitespace("already clean");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "already clean");
    }

    #[test]
    fn test_collapse_mixed_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n b\t c  "), "a b c");
    }

    #[test]
    fn test_ascii_fold_spanish_and_portuguese() {
        assert_eq!(ascii_fold("Nicolás"), "Nicolas");
        assert_eq!(ascii_fold("São João"), "Sao Joao");
        assert_eq!(ascii_fold("pingüino"), "pinguino");
    }

    #[test]
    fn test_ascii_fold_borrows_ascii() {
        assert!(matches!(ascii_fold("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_norm_words_transliterates_non_latin() {
        assert_eq!(ascii_fold("Москва"), "Moskva");

        let words = norm_words("Россия, Ελλάδα: Москва");
        assert_eq!(words.split(' ').count(), 3, "got {words:?}");
        assert!(words.ends_with("Moskva"), "got {words:?}");
    }

    #[test]
    fn test_norm_words() {
        assert_eq!(norm_words("  Hello,   World! 123 "), "Hello World");
        assert_eq!(norm_words("Gabriela-Ford San Nicolás"), "Gabriela Ford San Nicolas");
        assert_eq!(norm_words("!!! 42"), "");
    }

    #[test]
    fn test_norm_words_keeps_only_letters() {
        // Brackets and underscores are not letters
        assert_eq!(norm_words("a[b]c_d^e`f"), "a b c d e f");
    }
}
