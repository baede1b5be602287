use serde::{Deserialize, Serialize};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Local failure notice; shown to the user but never sent upstream.
    #[serde(skip)]
    pub notice: bool,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            notice: false,
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub fn notice(content: impl Into<String>) -> Self {
        Self {
            notice: true,
            ..Self::assistant(content)
        }
    }
}

/// Observer that receives the growing assistant text.
///
/// Called once per applied fragment with the full text so far, never once
/// per raw line or byte.
pub trait MessageSink {
    fn on_content(&mut self, content: &str);
}

impl<F> MessageSink for F
where
    F: FnMut(&str),
{
    fn on_content(&mut self, content: &str) {
        self(content);
    }
}

/// Ordered message log with the append-or-extend rule for streaming turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Append a terminal failure notice as its own assistant entry, after
    /// whatever partial text already streamed.
    pub fn push_failure(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::notice(content));
    }

    /// Replace the content of a trailing assistant entry, or append one.
    /// A failure notice is never extended.
    pub fn merge_assistant(&mut self, content: &str) {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant && !last.notice => {
                last.content.clear();
                last.content.push_str(content);
            }
            _ => self.messages.push(ChatMessage::assistant(content)),
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The conversation as the gateway should see it, without failure notices.
    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|message| !message.notice)
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl MessageSink for ChatLog {
    fn on_content(&mut self, content: &str) {
        self.merge_assistant(content);
    }
}

/// Lifecycle of one streaming turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnStatus {
    /// No fragment applied yet.
    #[default]
    Empty,
    /// At least one fragment applied, stream still open.
    Streaming,
    /// Sentinel seen or transport closed; further fragments are discarded.
    Closed,
}

/// Running assistant text for the turn in flight.
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    assistant_so_far: String,
    status: TurnStatus,
    fragments: usize,
}

impl MessageAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and notify `sink` with the full content.
    ///
    /// Returns `false` when the fragment was discarded: the turn is closed
    /// or the fragment is empty.
    pub fn apply_fragment(&mut self, text: &str, sink: &mut dyn MessageSink) -> bool {
        if self.status == TurnStatus::Closed {
            tracing::trace!(len = text.len(), "discarding fragment after close");
            return false;
        }
        if text.is_empty() {
            return false;
        }
        self.assistant_so_far.push_str(text);
        self.status = TurnStatus::Streaming;
        self.fragments += 1;
        sink.on_content(&self.assistant_so_far);
        true
    }

    pub fn close(&mut self) {
        self.status = TurnStatus::Closed;
    }

    /// Start over for a fresh turn.
    pub fn reset(&mut self) {
        self.assistant_so_far.clear();
        self.status = TurnStatus::Empty;
        self.fragments = 0;
    }

    #[must_use]
    pub fn current_content(&self) -> &str {
        &self.assistant_so_far
    }

    #[must_use]
    pub fn status(&self) -> TurnStatus {
        self.status
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == TurnStatus::Closed
    }

    /// Number of fragments applied this turn.
    #[must_use]
    pub fn fragments(&self) -> usize {
        self.fragments
    }
}
