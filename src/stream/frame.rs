//! Classification of a single SSE line.
//!
//! Only `data:` lines carry meaning here; `event:`, `id:` and `retry:` fields
//! and any other shape fall through to [`Frame::Blank`].

const DATA_PREFIX: &str = "data:";
const SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Empty, whitespace-only, or unrecognized line.
    Blank,
    /// `:`-prefixed keep-alive or comment.
    Comment,
    /// Payload of a `data:` line, with one optional leading space removed.
    Data(&'a str),
    /// The `data: [DONE]` terminal marker.
    Sentinel,
}

impl Frame<'_> {
    /// Whether the frame can be skipped without further inspection.
    #[must_use]
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Frame::Blank | Frame::Comment)
    }
}

#[must_use]
pub fn classify(line: &str) -> Frame<'_> {
    if line.trim().is_empty() {
        return Frame::Blank;
    }
    if line.starts_with(':') {
        return Frame::Comment;
    }
    let Some(value) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Blank;
    };
    let value = value.strip_prefix(' ').unwrap_or(value);
    if value.trim() == SENTINEL {
        Frame::Sentinel
    } else {
        Frame::Data(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_whitespace() {
        assert_eq!(classify(""), Frame::Blank);
        assert_eq!(classify("   \t"), Frame::Blank);
    }

    #[test]
    fn test_comment() {
        assert_eq!(classify(": keep-alive"), Frame::Comment);
        assert_eq!(classify(":"), Frame::Comment);
        assert!(classify(": ping").is_ignorable());
    }

    #[test]
    fn test_data_with_and_without_space() {
        assert_eq!(classify("data: {\"a\":1}"), Frame::Data("{\"a\":1}"));
        assert_eq!(classify("data:{\"a\":1}"), Frame::Data("{\"a\":1}"));
    }

    #[test]
    fn test_sentinel_after_trim() {
        assert_eq!(classify("data: [DONE]"), Frame::Sentinel);
        assert_eq!(classify("data:[DONE]  "), Frame::Sentinel);
        assert_eq!(classify("data: [DONE]x"), Frame::Data("[DONE]x"));
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert_eq!(classify("DATA: {}"), Frame::Blank);
    }

    #[test]
    fn test_other_fields_are_ignored() {
        assert_eq!(classify("event: message"), Frame::Blank);
        assert_eq!(classify("id: 7"), Frame::Blank);
        assert_eq!(classify("retry: 1000"), Frame::Blank);
    }
}
