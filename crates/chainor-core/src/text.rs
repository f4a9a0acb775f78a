/// Truncate a string to at most `max` characters, respecting char boundaries.
///
/// Returns a borrowed slice when the text already fits, so callers that
/// mostly see short text avoid an allocation.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
