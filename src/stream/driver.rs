//! Outer read loop: the only code that pulls chunks from the transport.

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::{MessageSink, TurnDecoder};
use crate::error::StreamError;

/// How a turn stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEnd {
    /// `[DONE]` received.
    Completed,
    /// Transport closed without a sentinel.
    Eof,
    /// The caller aborted the turn.
    Cancelled,
    /// The transport failed mid-stream.
    Failed,
}

/// Final state of a streamed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub content: String,
    pub end: TurnEnd,
    pub fragments: usize,
    pub dropped_frames: usize,
}

/// A transport failure together with the text that streamed before it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct StreamFailure {
    pub error: StreamError,
    pub partial: TurnOutcome,
}

#[derive(Debug, Default)]
pub struct StreamDriver {
    decoder: TurnDecoder,
}

impl StreamDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `body` to its end, feeding every chunk through the decoder.
    ///
    /// Cancellation is checked before every read and stops the loop with
    /// [`TurnEnd::Cancelled`]; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StreamFailure`] when the body yields an error. The partial
    /// text is kept in [`StreamFailure::partial`].
    pub async fn run<S, B, E>(
        mut self,
        body: S,
        sink: &mut dyn MessageSink,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, StreamFailure>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<StreamError>,
    {
        let mut body = std::pin::pin!(body);
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.decoder.close();
                    return Ok(self.into_outcome(TurnEnd::Cancelled));
                }
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if self.decoder.feed(chunk.as_ref(), sink).is_done() {
                        return Ok(self.into_outcome(TurnEnd::Completed));
                    }
                }
                Some(Err(err)) => {
                    self.decoder.close();
                    let error: StreamError = err.into();
                    tracing::debug!(
                        fragments = self.decoder.fragments(),
                        "stream failed mid-turn: {error}"
                    );
                    return Err(StreamFailure {
                        error,
                        partial: self.into_outcome(TurnEnd::Failed),
                    });
                }
                None => {
                    self.decoder.finish(sink);
                    let end = if self.decoder.saw_sentinel() {
                        TurnEnd::Completed
                    } else {
                        TurnEnd::Eof
                    };
                    return Ok(self.into_outcome(end));
                }
            }
        }
    }

    fn into_outcome(self, end: TurnEnd) -> TurnOutcome {
        let fragments = self.decoder.fragments();
        let dropped_frames = self.decoder.dropped_frames();
        TurnOutcome {
            content: self.decoder.into_content(),
            end,
            fragments,
            dropped_frames,
        }
    }
}
