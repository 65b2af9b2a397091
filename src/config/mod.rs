//! Configuration module.
//!
//! Two layers, loaded independently:
//! - [`bot`]: per-bot XML configuration, one document per account.
//! - [`crate::config::types::Config`] (process-wide): JSON configuration
//!   shared by every bot in the process, loadable from file, environment
//!   variable overrides, or compiled-in defaults via [`loader::load`].
//!
//! # Module Structure
//!
//! - [`bot`]: per-bot `BotConfig` and the XML directory scanner
//! - [`crate::config::types`]: root process-wide `Config` struct
//! - [`logging`]: logging configuration shared by both layers
//! - [`crate::config::loader`]: configuration loading functions
//! - [`crate::config::validation`]: configuration validation functions
//! - [`crate::config::defaults`]: default value functions

pub mod bot;
pub mod defaults;
pub mod loader;
pub mod logging;
pub mod types;
pub mod validation;

pub use bot::{BotConfig, BotConfigError};
pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use types::Config;
pub use validation::validate_config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.bot_config_dir, "config");
        assert_eq!(config.connect_throttle_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn config_serialization_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.bot_config_dir, deserialized.bot_config_dir);
        assert_eq!(config.connect_throttle_secs, deserialized.connect_throttle_secs);
    }

    #[test]
    fn log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn log_level_as_str() {
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
    }
}
