//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, DeliveryConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_delivery_config(&config.delivery)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter module: {module:?}"
        )));
    }

    Ok(())
}

fn validate_delivery_config(delivery: &DeliveryConfig) -> ConfigResult<()> {
    if delivery.handler_timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "delivery.handler_timeout_ms must be greater than 0",
        ));
    }

    if delivery.max_queued_events == Some(0) {
        return Err(ConfigError::validation(
            "delivery.max_queued_events must be greater than 0",
        ));
    }

    Ok(())
}
