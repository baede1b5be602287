const MAX_LEN: usize = 500;

/// Reduce an upstream error body to something fit for a user-facing message.
///
/// Takes `error.message` from JSON bodies (`{"error":{"message":..}}` or
/// `{"error":"..."}`), otherwise the body as lossy UTF-8. Capped at 500 chars.
#[must_use]
pub fn sanitize_upstream_error(body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        let message = json.get("error").and_then(|error| {
            error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .or_else(|| error.as_str())
        });
        if let Some(message) = message {
            return truncate_chars(message.trim());
        }
    }

    let raw = String::from_utf8_lossy(body);
    truncate_chars(raw.trim())
}

fn truncate_chars(text: &str) -> String {
    match text.char_indices().nth(MAX_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_style_error_message() {
        let body = br#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#;
        assert_eq!(sanitize_upstream_error(body), "model not found");
    }

    #[test]
    fn test_plain_string_error() {
        assert_eq!(
            sanitize_upstream_error(br#"{"error":"rate limited"}"#),
            "rate limited"
        );
    }

    #[test]
    fn test_non_json_body_is_kept() {
        assert_eq!(sanitize_upstream_error(b"Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_long_body_truncated_on_char_boundary() {
        let body = "é".repeat(MAX_LEN + 10);
        let message = sanitize_upstream_error(body.as_bytes());
        assert!(message.ends_with("..."));
        assert_eq!(message.chars().count(), MAX_LEN + 3);
    }
}
