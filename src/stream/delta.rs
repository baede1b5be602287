use serde::Deserialize;

/// Result of reading one `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Non-empty text to append to the assistant message.
    Fragment(String),
    /// Well-formed JSON without any text for this turn (role headers,
    /// finish reasons, usage chunks).
    NoFragment,
    /// The payload is not valid JSON yet; it needs more bytes.
    Incomplete,
}

/// The only slice of a chat-completion chunk this crate reads:
/// `choices[0].delta.content`.
#[derive(Debug, Default, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the incremental text fragment from a data payload.
///
/// Syntactically invalid JSON is reported as [`DeltaOutcome::Incomplete`];
/// valid JSON of any other shape yields [`DeltaOutcome::NoFragment`].
#[must_use]
pub fn extract(payload: &str) -> DeltaOutcome {
    if payload.trim().is_empty() {
        return DeltaOutcome::NoFragment;
    }
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => return DeltaOutcome::Incomplete,
    };
    let Ok(chunk) = CompletionChunk::deserialize(value) else {
        return DeltaOutcome::NoFragment;
    };
    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        Some(content) if !content.is_empty() => DeltaOutcome::Fragment(content),
        _ => DeltaOutcome::NoFragment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_from_first_choice() {
        let payload = r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Olá"}}]}"#;
        assert_eq!(extract(payload), DeltaOutcome::Fragment("Olá".to_string()));
    }

    #[test]
    fn test_only_first_choice_is_read() {
        let payload = r#"{"choices":[{"delta":{}},{"delta":{"content":"second"}}]}"#;
        assert_eq!(extract(payload), DeltaOutcome::NoFragment);
    }

    #[test]
    fn test_role_header_has_no_fragment() {
        let payload = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(extract(payload), DeltaOutcome::NoFragment);
    }

    #[test]
    fn test_empty_and_null_content() {
        assert_eq!(
            extract(r#"{"choices":[{"delta":{"content":""}}]}"#),
            DeltaOutcome::NoFragment
        );
        assert_eq!(
            extract(r#"{"choices":[{"delta":{"content":null}}]}"#),
            DeltaOutcome::NoFragment
        );
    }

    #[test]
    fn test_usage_chunk_without_choices() {
        let payload = r#"{"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":1}}"#;
        assert_eq!(extract(payload), DeltaOutcome::NoFragment);
    }

    #[test]
    fn test_unexpected_shape_is_not_incomplete() {
        assert_eq!(extract(r#"{"choices":"nope"}"#), DeltaOutcome::NoFragment);
        assert_eq!(extract("42"), DeltaOutcome::NoFragment);
    }

    #[test]
    fn test_truncated_json_is_incomplete() {
        assert_eq!(
            extract(r#"{"choices":[{"delta":{"content":"Ol"#),
            DeltaOutcome::Incomplete
        );
    }

    #[test]
    fn test_empty_payload_has_no_fragment() {
        assert_eq!(extract(""), DeltaOutcome::NoFragment);
        assert_eq!(extract("  "), DeltaOutcome::NoFragment);
    }
}
