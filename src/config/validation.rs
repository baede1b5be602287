use super::{AppConfig, ConfigError};

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_gateway(config)?;
    validate_chat(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_gateway(config: &AppConfig) -> Result<(), ConfigError> {
    let gateway = &config.gateway;
    let url = url::Url::parse(&gateway.base_url)
        .map_err(|err| validation_err(format!("gateway.base_url is not a valid URL: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(validation_err(format!(
            "gateway.base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if gateway.api_key.trim().is_empty() {
        return Err(validation_err("gateway.api_key cannot be empty"));
    }
    if gateway.model.trim().is_empty() {
        return Err(validation_err("gateway.model cannot be empty"));
    }
    if !gateway.chat_path.starts_with('/') {
        return Err(validation_err("gateway.chat_path must start with '/'"));
    }
    if gateway.timeout_secs == 0 {
        return Err(validation_err("gateway.timeout_secs must be greater than 0"));
    }
    if gateway.connect_timeout_secs == 0 {
        return Err(validation_err(
            "gateway.connect_timeout_secs must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_chat(config: &AppConfig) -> Result<(), ConfigError> {
    if config.chat.failure_message.trim().is_empty() {
        return Err(validation_err("chat.failure_message cannot be empty"));
    }
    if let Some(temperature) = config.chat.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(validation_err(
                "chat.temperature must be between 0.0 and 2.0",
            ));
        }
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "features.log_level must be one of {VALID_LOG_LEVELS:?}, got '{}'",
            config.features.log_level
        )));
    }
    Ok(())
}
