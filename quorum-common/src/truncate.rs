//! Channel message truncation
//!
//! The chat platform enforces a hard character limit on outbound message
//! content. Anything longer is cut to exactly the limit, ending in a
//! visible truncation marker; anything at or under the limit passes
//! through unchanged. Lengths are counted in characters, not bytes.

/// Hard limit on outbound channel message content, in characters
pub const CHANNEL_MESSAGE_LIMIT: usize = 2000;

/// Marker appended to truncated messages
pub const TRUNCATION_MARKER: &str = "\n…(truncated)";

/// Truncate `text` to at most `limit` characters.
///
/// Over-limit text becomes exactly `limit` characters: the first
/// `limit - marker_len` characters of the input followed by the marker.
/// Idempotent: truncating already-truncated text changes nothing.
/// Limits too small to hold the marker get a plain hard cut instead, so
/// the output never exceeds `limit`.
pub fn truncate_message(text: &str, limit: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= limit {
        return text.to_string();
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    if limit < marker_len {
        return text.chars().take(limit).collect();
    }

    let mut out: String = text.chars().take(limit - marker_len).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_at_or_under_limit_is_unchanged() {
        let exact: String = "a".repeat(CHANNEL_MESSAGE_LIMIT);
        assert_eq!(truncate_message(&exact, CHANNEL_MESSAGE_LIMIT), exact);

        let short = "hello";
        assert_eq!(truncate_message(short, CHANNEL_MESSAGE_LIMIT), short);
    }

    #[test]
    fn over_limit_text_becomes_exactly_limit_chars() {
        let long: String = "a".repeat(CHANNEL_MESSAGE_LIMIT + 500);
        let truncated = truncate_message(&long, CHANNEL_MESSAGE_LIMIT);
        assert_eq!(truncated.chars().count(), CHANNEL_MESSAGE_LIMIT);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_is_idempotent() {
        let long: String = "b".repeat(3000);
        let once = truncate_message(&long, CHANNEL_MESSAGE_LIMIT);
        let twice = truncate_message(&once, CHANNEL_MESSAGE_LIMIT);
        assert_eq!(once, twice);
    }

    #[test]
    fn limits_below_marker_length_hard_cut() {
        let marker_len = TRUNCATION_MARKER.chars().count();
        let long = "x".repeat(100);
        for limit in 0..marker_len {
            let out = truncate_message(&long, limit);
            assert_eq!(out.chars().count(), limit);
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Multibyte characters must not split or overshoot the limit
        let long: String = "é".repeat(50);
        let truncated = truncate_message(&long, 20);
        assert_eq!(truncated.chars().count(), 20);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }
}
