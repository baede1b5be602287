use crate::stream::TurnOutcome;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
///
/// Logs go to stderr; stdout is reserved for the transcript.
pub fn init_tracing(log_level: &str) {
    let Some(filter) = filter_for_level(log_level) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn filter_for_level(log_level: &str) -> Option<EnvFilter> {
    let level = log_level.to_uppercase();
    if level == "DISABLED" {
        return None;
    }

    let tracing_level = match level.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };

    Some(EnvFilter::try_new(tracing_level).unwrap_or_else(|_| EnvFilter::new("INFO")))
}

/// Log a one-line summary for a finished turn.
pub fn log_turn_complete(model: &str, outcome: &TurnOutcome, start_time: std::time::Instant) {
    tracing::info!(
        model,
        end = ?outcome.end,
        fragments = outcome.fragments,
        chars = outcome.content.chars().count(),
        dropped_frames = outcome.dropped_frames,
        elapsed_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
        "turn complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_installs_nothing() {
        assert!(filter_for_level("disabled").is_none());
    }

    #[test]
    fn test_level_aliases_build_filters() {
        assert!(filter_for_level("WARNING").is_some());
        assert!(filter_for_level("critical").is_some());
        assert!(filter_for_level("debug").is_some());
    }
}
