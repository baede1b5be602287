//! Streaming UTF-8 decoder for response body chunks.
//!
//! Chunk boundaries from the transport can fall inside a multi-byte
//! sequence. The trailing incomplete sequence is held back until the next
//! chunk completes it; genuinely invalid bytes become U+FFFD.

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Default)]
pub struct Utf8Decoder {
    remainder: Vec<u8>,
}

impl Utf8Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk` into text. With `last = true` any held-back tail is
    /// flushed as replacement characters.
    #[must_use]
    pub fn decode(&mut self, chunk: &[u8], last: bool) -> String {
        let mut out = String::with_capacity(self.remainder.len() + chunk.len());
        self.decode_into(chunk, last, &mut out);
        out
    }

    /// Same as [`Utf8Decoder::decode`] but appends into a caller-provided buffer.
    pub fn decode_into(&mut self, chunk: &[u8], last: bool, out: &mut String) {
        if self.remainder.is_empty() {
            let tail = push_valid_prefix(chunk, out);
            self.remainder.extend_from_slice(tail);
        } else {
            self.remainder.extend_from_slice(chunk);
            let pending = std::mem::take(&mut self.remainder);
            let tail = push_valid_prefix(&pending, out);
            self.remainder.extend_from_slice(tail);
        }

        if last && !self.remainder.is_empty() {
            out.push(REPLACEMENT);
            self.remainder.clear();
        }
    }

    /// Number of bytes held back waiting for the rest of a code point.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.remainder.len()
    }
}

/// Push every decodable byte of `bytes` into `out` and return the
/// incomplete trailing sequence, if any.
fn push_valid_prefix<'a>(mut bytes: &'a [u8], out: &mut String) -> &'a [u8] {
    loop {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                out.push_str(text);
                return &[];
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                if let Ok(text) = std::str::from_utf8(valid) {
                    out.push_str(text);
                }
                match err.error_len() {
                    Some(invalid_len) => {
                        out.push(REPLACEMENT);
                        bytes = &rest[invalid_len..];
                    }
                    None => return rest,
                }
            }
        }
    }
}
