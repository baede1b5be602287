//! Carry buffer that turns arbitrarily sliced text into whole lines.
//!
//! Text is appended with [`LineReassembler::push`] and complete lines are
//! pulled one at a time with [`LineReassembler::next_line`], so a consumer
//! can stop mid-batch and leave the remaining lines in the carry. A line
//! handed back through [`LineReassembler::unshift`] is held at the front of
//! the carry and only re-emitted once the following line has arrived, joined
//! to it with the original line break.

use memchr::memchr;
use smallvec::SmallVec;

const COMPACT_THRESHOLD: usize = 8 * 1024;

#[derive(Debug, Default)]
pub struct LineReassembler {
    carry: String,
    read_offset: usize,
    held: usize,
}

impl LineReassembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text to the carry.
    pub fn push(&mut self, text: &str) {
        self.carry.push_str(text);
    }

    /// Append text and drain every complete line it produced.
    pub fn feed(&mut self, text: &str) -> Vec<String> {
        self.push(text);
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line);
        }
        lines
    }

    /// Take the next `\n`-terminated line out of the carry, without its
    /// terminator and with one trailing `\r` stripped.
    pub fn next_line(&mut self) -> Option<String> {
        let unread = &self.carry.as_bytes()[self.read_offset..];
        let rel_end = self.held + memchr(b'\n', unread.get(self.held..)?)?;

        let start = self.read_offset;
        let end = start + rel_end;
        let mut line = &self.carry[start..end];
        if let Some(stripped) = line.strip_suffix('\r') {
            line = stripped;
        }
        let line = line.to_owned();

        self.read_offset = end + 1;
        self.held = 0;
        self.compact();
        Some(line)
    }

    /// Put a raw line back at the front of the carry, followed by a line
    /// break. It stays held until the next line completes behind it.
    pub fn unshift(&mut self, line: &str) {
        let rest = self.carry.split_off(self.read_offset);
        self.carry.clear();
        self.carry.reserve(line.len() + 1 + rest.len());
        self.carry.push_str(line);
        self.carry.push('\n');
        self.carry.push_str(&rest);
        self.read_offset = 0;
        self.held = line.len() + 1;
    }

    /// The complete line queued behind a held line, if it has arrived.
    #[must_use]
    pub fn peek_continuation(&self) -> Option<&str> {
        if self.held == 0 {
            return None;
        }
        let start = self.read_offset + self.held;
        let rel_end = memchr(b'\n', self.carry.as_bytes().get(start..)?)?;
        let line = &self.carry[start..start + rel_end];
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// Remove the held line from the front of the carry and return it,
    /// without the line break that was appended by [`LineReassembler::unshift`].
    pub fn release_held(&mut self) -> Option<String> {
        if self.held == 0 {
            return None;
        }
        let start = self.read_offset;
        let end = start + self.held;
        let line = self.carry[start..end - 1].to_owned();
        self.read_offset = end;
        self.held = 0;
        self.compact();
        Some(line)
    }

    /// Drain whatever is left once the transport has ended.
    ///
    /// The tail may hold several unterminated logical lines batched together,
    /// so it is split on `\n` one last time and every non-empty piece is
    /// returned.
    pub fn flush(&mut self) -> SmallVec<[String; 4]> {
        let rest = &self.carry[self.read_offset..];
        let pieces = rest
            .split('\n')
            .map(|piece| piece.strip_suffix('\r').unwrap_or(piece))
            .filter(|piece| !piece.is_empty())
            .map(str::to_owned)
            .collect();
        self.clear();
        pieces
    }

    /// Drop everything still buffered.
    pub fn clear(&mut self) {
        self.carry.clear();
        self.read_offset = 0;
        self.held = 0;
    }

    /// Bytes buffered but not yet handed out as lines.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.carry.len() - self.read_offset
    }

    /// Whether a re-buffered line is waiting for its continuation.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.held > 0
    }

    fn compact(&mut self) {
        if self.read_offset == self.carry.len() {
            self.carry.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.carry.len() / 2
                || self.read_offset >= COMPACT_THRESHOLD);
        if should_compact {
            self.carry.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines_in_one_chunk() {
        let mut lines = LineReassembler::new();
        let out = lines.feed("data: a\n\ndata: b\n");
        assert_eq!(out, vec!["data: a", "", "data: b"]);
        assert_eq!(lines.pending_len(), 0);
    }

    #[test]
    fn test_partial_line_stays_in_carry() {
        let mut lines = LineReassembler::new();
        assert!(lines.feed("data: hel").is_empty());
        assert_eq!(lines.pending_len(), 9);
        assert_eq!(lines.feed("lo\nda"), vec!["data: hello"]);
        assert_eq!(lines.pending_len(), 2);
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut lines = LineReassembler::new();
        assert_eq!(lines.feed("data: x\r\n\r\n"), vec!["data: x", ""]);
    }

    #[test]
    fn test_next_line_leaves_rest_for_later() {
        let mut lines = LineReassembler::new();
        lines.push("one\ntwo\nthree\n");
        assert_eq!(lines.next_line().as_deref(), Some("one"));
        assert_eq!(lines.pending_len(), "two\nthree\n".len());
        assert_eq!(lines.next_line().as_deref(), Some("two"));
        assert_eq!(lines.next_line().as_deref(), Some("three"));
        assert_eq!(lines.next_line(), None);
    }

    #[test]
    fn test_unshift_holds_until_continuation() {
        let mut lines = LineReassembler::new();
        lines.push("data: {\"a\":\n");
        let first = lines.next_line().expect("line");
        lines.unshift(&first);
        assert!(lines.is_holding());
        assert_eq!(lines.next_line(), None);

        lines.push("1}\n");
        assert_eq!(lines.next_line().as_deref(), Some("data: {\"a\":\n1}"));
        assert!(!lines.is_holding());
    }

    #[test]
    fn test_unshift_keeps_following_lines_in_order() {
        let mut lines = LineReassembler::new();
        lines.push("head\nnext\n");
        let head = lines.next_line().expect("line");
        lines.unshift(&head);
        assert_eq!(lines.next_line().as_deref(), Some("head\nnext"));
        assert_eq!(lines.next_line(), None);
    }

    #[test]
    fn test_peek_and_release_held_line() {
        let mut lines = LineReassembler::new();
        lines.push("data: {\"broken\"\n");
        let head = lines.next_line().expect("line");
        lines.unshift(&head);
        assert_eq!(lines.peek_continuation(), None);

        lines.push("data: {}\r\n");
        assert_eq!(lines.peek_continuation(), Some("data: {}"));
        assert_eq!(lines.release_held().as_deref(), Some("data: {\"broken\""));
        assert!(!lines.is_holding());
        assert_eq!(lines.next_line().as_deref(), Some("data: {}"));
    }

    #[test]
    fn test_flush_splits_batched_tail() {
        let mut lines = LineReassembler::new();
        lines.push("data: a\n\ndata: b");
        assert_eq!(lines.next_line().as_deref(), Some("data: a"));
        let rest = lines.flush();
        assert_eq!(rest.as_slice(), ["data: b".to_string()]);
        assert_eq!(lines.pending_len(), 0);
    }

    #[test]
    fn test_flush_of_empty_carry_is_empty() {
        let mut lines = LineReassembler::new();
        assert!(lines.flush().is_empty());
    }

    #[test]
    fn test_large_carry_is_compacted() {
        let mut lines = LineReassembler::new();
        let long = "x".repeat(COMPACT_THRESHOLD);
        lines.push(&long);
        lines.push("\ntail");
        assert_eq!(lines.next_line().map(|l| l.len()), Some(COMPACT_THRESHOLD));
        assert_eq!(lines.pending_len(), 4);
        assert_eq!(lines.read_offset, 0);
    }
}
