use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::ChatConfig;
use crate::error::StreamError;
use crate::observability::log_turn_complete;
use crate::stream::{
    ChatLog, ChatMessage, MessageSink, Role, StreamDriver, StreamFailure, TurnEnd, TurnOutcome,
};
use crate::transport::{ChatCompletionRequest, GatewayClient};

/// What happened to one `send`.
#[derive(Debug)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    pub error: Option<StreamError>,
}

impl TurnReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// One conversation with the gateway, streamed one turn at a time.
///
/// Owns the message log; the decoder only ever reaches it through the
/// append-or-extend merge.
pub struct ChatSession {
    client: GatewayClient,
    chat: ChatConfig,
    model: String,
    log: ChatLog,
}

/// Forwards every update to the log and to an extra observer.
struct TeeSink<'a, 'b> {
    log: &'a mut ChatLog,
    extra: &'a mut (dyn MessageSink + 'b),
}

impl MessageSink for TeeSink<'_, '_> {
    fn on_content(&mut self, content: &str) {
        self.log.merge_assistant(content);
        self.extra.on_content(content);
    }
}

impl ChatSession {
    #[must_use]
    pub fn new(client: GatewayClient, chat: ChatConfig, model: impl Into<String>) -> Self {
        Self {
            client,
            chat,
            model: model.into(),
            log: ChatLog::new(),
        }
    }

    #[must_use]
    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.log.clear();
    }

    /// Send `prompt` and stream the answer into the log.
    ///
    /// `observer` sees the same growing text the log does. A failure to open
    /// or read the stream appends exactly one failure notice to the log and
    /// is returned in [`TurnReport::error`]. Cancellation, including while
    /// waiting for the response headers, is not a failure.
    pub async fn send(
        &mut self,
        prompt: &str,
        cancel: &CancellationToken,
        observer: &mut dyn MessageSink,
    ) -> TurnReport {
        let started = Instant::now();
        self.log.push_user(prompt);
        let request = self.build_request();

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("turn cancelled before the stream opened");
                return TurnReport {
                    outcome: empty_outcome(TurnEnd::Cancelled),
                    error: None,
                };
            }
            opened = self.client.open_stream(&request) => opened,
        };
        let body = match opened {
            Ok(body) => body,
            Err(error) => {
                return self.fail(error, empty_outcome(TurnEnd::Failed));
            }
        };

        let mut sink = TeeSink {
            log: &mut self.log,
            extra: observer,
        };
        match StreamDriver::new().run(body, &mut sink, cancel).await {
            Ok(outcome) => {
                log_turn_complete(&self.model, &outcome, started);
                TurnReport {
                    outcome,
                    error: None,
                }
            }
            Err(StreamFailure { error, partial }) => self.fail(error, partial),
        }
    }

    fn build_request(&self) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(self.log.len() + 1);
        if let Some(system_prompt) = self.chat.system_prompt.as_deref() {
            messages.push(ChatMessage::new(Role::System, system_prompt));
        }
        messages.extend(self.log.history().cloned());

        let mut request = ChatCompletionRequest::streaming(self.model.clone(), messages);
        request.temperature = self.chat.temperature;
        request
    }

    fn fail(&mut self, error: StreamError, outcome: TurnOutcome) -> TurnReport {
        tracing::error!(
            fragments = outcome.fragments,
            retryable = error.is_retryable(),
            "turn failed: {error}"
        );
        self.log
            .push_failure(error.user_message(&self.chat.failure_message));
        TurnReport {
            outcome,
            error: Some(error),
        }
    }
}

fn empty_outcome(end: TurnEnd) -> TurnOutcome {
    TurnOutcome {
        content: String::new(),
        end,
        fragments: 0,
        dropped_frames: 0,
    }
}
