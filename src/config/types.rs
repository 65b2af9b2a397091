//! Root process-wide configuration type.

use super::defaults::{default_bot_config_dir, default_connect_throttle_secs};
use super::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Process-wide configuration: shared by every bot in the process.
///
/// Distinct from the per-bot [`crate::config::bot::BotConfig`], which is one
/// XML document per account.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Directory scanned for `<bot_name>.xml` files.
    #[serde(default = "default_bot_config_dir")]
    pub bot_config_dir: String,
    /// Minimum spacing between platform connect attempts, process-wide.
    #[serde(default = "default_connect_throttle_secs")]
    pub connect_throttle_secs: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_config_dir: default_bot_config_dir(),
            connect_throttle_secs: default_connect_throttle_secs(),
            logging: LoggingConfig::default(),
        }
    }
}
