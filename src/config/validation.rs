//! Process-wide configuration validation.

use super::Config;
use std::path::Path;

/// Validate a loaded [`Config`], returning an error describing the first
/// problem found.
///
/// Called unconditionally (warn-only) by [`super::loader::load`], and called
/// again by the CLI's `--validate-config` mode, which propagates the error as
/// a non-zero exit code instead of merely logging it.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.connect_throttle_secs == 0 {
        anyhow::bail!(
            "connect_throttle_secs must be at least 1 second; 0 would hammer the platform's \
             connection manager pool on every reconnect"
        );
    }

    if config.bot_config_dir.trim().is_empty() {
        anyhow::bail!("bot_config_dir must not be empty");
    }

    let dir = Path::new(&config.bot_config_dir);
    if dir.exists() && !dir.is_dir() {
        anyhow::bail!(
            "bot_config_dir '{}' exists but is not a directory",
            config.bot_config_dir
        );
    }

    if config.logging.enable_file_logging && config.logging.dir.trim().is_empty() {
        anyhow::bail!("logging.dir must not be empty when enable_file_logging is true");
    }

    Ok(())
}
