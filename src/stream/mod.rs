pub mod accumulator;
pub mod delta;
pub mod driver;
pub mod frame;
pub mod lines;
pub mod utf8;

pub use accumulator::{ChatLog, ChatMessage, MessageAccumulator, MessageSink, Role, TurnStatus};
pub use delta::{extract, DeltaOutcome};
pub use driver::{StreamDriver, StreamFailure, TurnEnd, TurnOutcome};
pub use frame::{classify, Frame};
pub use lines::LineReassembler;
pub use utf8::Utf8Decoder;

/// What the caller should do after handing a chunk to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Keep reading from the transport.
    NeedMore,
    /// The sentinel was seen; stop reading.
    Done,
}

impl Progress {
    #[must_use]
    pub fn is_done(self) -> bool {
        self == Progress::Done
    }
}

enum LineStep {
    Next,
    Rebuffer,
    Sentinel,
}

/// Decoder state for a single turn: bytes in, assistant text out.
///
/// Owns the UTF-8 remainder, the line carry and the accumulator. A new
/// instance must be built for every request.
#[derive(Debug, Default)]
pub struct TurnDecoder {
    utf8: Utf8Decoder,
    lines: LineReassembler,
    accumulator: MessageAccumulator,
    scratch: String,
    dropped_frames: usize,
    sentinel_seen: bool,
}

impl TurnDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one transport chunk and apply every fragment it completes.
    pub fn feed(&mut self, chunk: &[u8], sink: &mut dyn MessageSink) -> Progress {
        if self.accumulator.is_closed() {
            return Progress::Done;
        }
        self.scratch.clear();
        self.utf8.decode_into(chunk, false, &mut self.scratch);
        self.lines.push(&self.scratch);
        self.drain_lines(sink)
    }

    /// Handle end-of-stream: flush the carry and close the turn.
    ///
    /// The unterminated tail is treated as newline-terminated, so a held
    /// frame still gets joined with it. A frame that is incomplete after
    /// that is dropped and counted in [`TurnDecoder::dropped_frames`].
    pub fn finish(&mut self, sink: &mut dyn MessageSink) {
        if self.accumulator.is_closed() {
            return;
        }
        self.scratch.clear();
        self.utf8.decode_into(&[], true, &mut self.scratch);
        self.lines.push(&self.scratch);

        if self.drain_lines(sink).is_done() {
            return;
        }
        let mut held = self.lines.release_held();

        for piece in self.lines.flush() {
            let line = match held.take() {
                Some(raw) if !starts_new_frame(&piece) => format!("{raw}\n{piece}"),
                Some(raw) => {
                    self.drop_frame(&raw);
                    piece
                }
                None => piece,
            };
            match self.process_line(&line, sink) {
                LineStep::Next => {}
                LineStep::Rebuffer => held = Some(line),
                LineStep::Sentinel => {
                    self.sentinel_seen = true;
                    break;
                }
            }
        }
        if let Some(raw) = held {
            self.drop_frame(&raw);
        }
        self.accumulator.close();
    }

    /// Stop the turn without flushing, e.g. on cancellation.
    pub fn close(&mut self) {
        self.accumulator.close();
        self.lines.clear();
    }

    #[must_use]
    pub fn content(&self) -> &str {
        self.accumulator.current_content()
    }

    #[must_use]
    pub fn status(&self) -> TurnStatus {
        self.accumulator.status()
    }

    #[must_use]
    pub fn fragments(&self) -> usize {
        self.accumulator.fragments()
    }

    /// Whether the turn ended on the `[DONE]` marker.
    #[must_use]
    pub fn saw_sentinel(&self) -> bool {
        self.sentinel_seen
    }

    /// Frames abandoned because they never became valid JSON.
    #[must_use]
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    /// Consume the decoder, returning the assembled text.
    #[must_use]
    pub fn into_content(self) -> String {
        self.accumulator.current_content().to_owned()
    }

    fn drain_lines(&mut self, sink: &mut dyn MessageSink) -> Progress {
        loop {
            if let Some(next) = self.lines.peek_continuation() {
                if starts_new_frame(next) {
                    if let Some(raw) = self.lines.release_held() {
                        self.drop_frame(&raw);
                    }
                }
            } else if self.lines.is_holding() {
                return Progress::NeedMore;
            }

            let Some(line) = self.lines.next_line() else {
                return Progress::NeedMore;
            };
            match self.process_line(&line, sink) {
                LineStep::Next => {}
                LineStep::Rebuffer => {
                    tracing::trace!(len = line.len(), "re-buffering incomplete data frame");
                    self.lines.unshift(&line);
                    return Progress::NeedMore;
                }
                LineStep::Sentinel => {
                    tracing::debug!(
                        fragments = self.accumulator.fragments(),
                        discarded = self.lines.pending_len(),
                        "sentinel received"
                    );
                    self.sentinel_seen = true;
                    self.close();
                    return Progress::Done;
                }
            }
        }
    }

    fn process_line(&mut self, line: &str, sink: &mut dyn MessageSink) -> LineStep {
        match classify(line) {
            Frame::Blank | Frame::Comment => LineStep::Next,
            Frame::Sentinel => LineStep::Sentinel,
            Frame::Data(payload) => match extract(payload) {
                DeltaOutcome::Fragment(text) => {
                    self.accumulator.apply_fragment(&text, sink);
                    LineStep::Next
                }
                DeltaOutcome::NoFragment => LineStep::Next,
                DeltaOutcome::Incomplete => LineStep::Rebuffer,
            },
        }
    }

    fn drop_frame(&mut self, raw: &str) {
        self.dropped_frames += 1;
        tracing::warn!(len = raw.len(), "dropping data frame that never became valid JSON");
    }
}

/// A held frame cannot continue into a line that opens a new frame or
/// ends the current event.
fn starts_new_frame(line: &str) -> bool {
    line.trim().is_empty() || !matches!(classify(line), Frame::Blank)
}
