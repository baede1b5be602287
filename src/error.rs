use crate::config::ConfigError;

/// Error type for everything that can end a turn early.
///
/// Decoder-level conditions (malformed frames, unknown lines, data after the
/// sentinel) are not errors and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// Whether a fresh request has a reasonable chance of succeeding.
    ///
    /// Informational only; nothing in this crate retries on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Upstream { status, .. } => {
                matches!(*status, 408 | 429) || (500..=599).contains(status)
            }
            StreamError::Transport(_) => true,
            StreamError::Config(_) | StreamError::Internal(_) => false,
        }
    }

    /// Text for the single assistant-visible failure notice of a turn.
    #[must_use]
    pub fn user_message(&self, prefix: &str) -> String {
        let detail = match self {
            StreamError::Upstream { status: 401 | 403, .. } => {
                "the gateway rejected the credentials".to_string()
            }
            StreamError::Upstream { status: 429, .. } => {
                "too many requests, please wait a moment".to_string()
            }
            StreamError::Upstream { status, message } if message.is_empty() => {
                format!("the gateway answered with status {status}")
            }
            StreamError::Upstream { status, message } => {
                format!("the gateway answered with status {status}: {message}")
            }
            StreamError::Transport(message) => format!("the connection failed: {message}"),
            StreamError::Config(message) | StreamError::Internal(message) => message.clone(),
        };
        format!("{prefix} ({detail}).")
    }
}

impl From<ConfigError> for StreamError {
    fn from(err: ConfigError) -> Self {
        StreamError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Transport(err.to_string())
    }
}

impl From<std::convert::Infallible> for StreamError {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}
