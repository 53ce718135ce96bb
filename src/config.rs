use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

use crate::services::store_client::WriteAck;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WRITE_ACK: &str = "confirm";
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Endpoint of the remote spreadsheet store (web app URL).
    /// Required; there is no safe built-in default.
    #[validate(custom = "validate_store_url")]
    pub store_url: String,

    /// Timeout for store requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    /// Write acknowledgement mode: "confirm" reads the store's response and
    /// reports real success/failure; "dispatch" reports success once the
    /// request has been sent (the legacy fire-and-forget behavior)
    #[serde(default = "default_write_ack")]
    #[validate(custom = "validate_write_ack")]
    pub write_ack: String,

    /// Log level: trace, debug, info, warn, or error
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable lines
    #[serde(default)]
    pub log_json: bool,

    /// Bounded capacity of the domain event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl AppConfig {
    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Gets the store request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parses the configured write acknowledgement mode.
    ///
    /// `validate()` has already confirmed the value, so an unparseable
    /// string here falls back to the default mode.
    pub fn write_ack(&self) -> WriteAck {
        self.write_ack.parse().unwrap_or_default()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_write_ack() -> String {
    DEFAULT_WRITE_ACK.to_string()
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn validate_store_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        _ => {
            let mut err = ValidationError::new("store_url");
            err.message = Some("Must be a valid http(s) URL".into());
            Err(err)
        }
    }
}

fn validate_write_ack(value: &str) -> Result<(), ValidationError> {
    match value.parse::<WriteAck>() {
        Ok(_) => Ok(()),
        Err(_) => {
            let mut err = ValidationError::new("write_ack");
            err.message = Some("Must be one of: confirm, dispatch".into());
            Err(err)
        }
    }
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("Must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("stocksheet={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config file (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "default".to_string());

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // NOTE: store_url has no default - it MUST be provided via environment
    // variable, config file, or the CLI override.
    let config = Config::builder()
        .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
        .set_default("write_ack", DEFAULT_WRITE_ACK)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default(
            "event_channel_capacity",
            DEFAULT_EVENT_CHANNEL_CAPACITY as u64,
        )?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("store_url").is_err() {
        error!("Store endpoint is not configured. Set APP__STORE_URL or add store_url to config/default.toml.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "store_url is required but not configured. Set APP__STORE_URL environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            store_url: "https://sheets.example.com/exec".into(),
            request_timeout_secs: 30,
            write_ack: "confirm".into(),
            log_level: "info".into(),
            log_json: false,
            event_channel_capacity: 64,
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_non_url_store_endpoint() {
        let mut cfg = base_config();
        cfg.store_url = "not a url".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_http_scheme() {
        let mut cfg = base_config();
        cfg.store_url = "ftp://sheets.example.com/exec".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_write_ack_mode() {
        let mut cfg = base_config();
        cfg.write_ack = "hope".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_event_channel_capacity() {
        let mut cfg = base_config();
        cfg.event_channel_capacity = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn write_ack_parses_both_modes() {
        let mut cfg = base_config();
        assert_eq!(cfg.write_ack(), WriteAck::Confirm);
        cfg.write_ack = "dispatch".into();
        assert_eq!(cfg.write_ack(), WriteAck::Dispatch);
    }

    #[test]
    fn request_timeout_converts_to_duration() {
        let mut cfg = base_config();
        cfg.request_timeout_secs = 5;
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
    }
}
