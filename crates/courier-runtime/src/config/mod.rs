//! Configuration module for the Courier runtime.
//!
//! This module provides layered configuration loading (defaults, TOML file,
//! environment variables, programmatic overrides) and validation of the
//! logging and delivery settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    CourierConfig, DeliveryConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
