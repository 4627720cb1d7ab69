//! Content preview helpers.

/// Marker appended to a preview when the source text was cut short.
pub const TRUNCATION_MARKER: &str = "...";

/// Default preview length, in characters, for message content in trace events.
pub const PREVIEW_CHARS: usize = 100;

/// Cut `text` down to at most `limit` characters.
///
/// Returns the preview and whether anything was dropped. When truncated, the
/// preview is the first `limit` characters followed by [`TRUNCATION_MARKER`].
/// Counting is by `char`, so multi-byte text never splits mid code point.
pub fn truncate(text: &str, limit: usize) -> (String, bool) {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => (format!("{}{}", &text[..cut], TRUNCATION_MARKER), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_unchanged() {
        let text = "a".repeat(50);
        let (preview, truncated) = truncate(&text, PREVIEW_CHARS);

        assert_eq!(preview, text);
        assert!(!truncated);
    }

    #[test]
    fn test_long_text_is_cut_with_marker() {
        let text = "b".repeat(150);
        let (preview, truncated) = truncate(&text, PREVIEW_CHARS);

        assert!(truncated);
        assert_eq!(preview.chars().count(), 100 + TRUNCATION_MARKER.len());
        assert!(preview.starts_with(&"b".repeat(100)));
        assert!(preview.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_exact_limit_is_not_truncated() {
        let text = "c".repeat(100);
        let (preview, truncated) = truncate(&text, PREVIEW_CHARS);

        assert_eq!(preview, text);
        assert!(!truncated);
    }

    #[test]
    fn test_multibyte_characters_are_counted_as_chars() {
        let text = "é".repeat(5);
        let (preview, truncated) = truncate(&text, 3);

        assert!(truncated);
        assert_eq!(preview, "ééé...");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(truncate("", 10), (String::new(), false));
    }
}
