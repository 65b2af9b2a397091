//! Default value functions for configuration fields.
//!
//! Organized by the struct each default serves, the same way the original
//! default-function module groups its constants into labeled sections.

use super::logging::LogFormat;
use crate::game::FarmingOrder;

// =============================================================================
// Process config
// =============================================================================

pub fn default_bot_config_dir() -> String {
    "config".to_string()
}

pub const fn default_connect_throttle_secs() -> u64 {
    30
}

// =============================================================================
// Logging defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "cardfarm.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Text
}

// =============================================================================
// Per-bot config defaults
// =============================================================================

pub const fn default_enabled() -> bool {
    true
}

pub fn default_null_string() -> String {
    "null".to_string()
}

pub fn default_parental_pin() -> String {
    "0".to_string()
}

pub const fn default_steam_id() -> u64 {
    0
}

pub const fn default_card_drops_restricted() -> bool {
    false
}

pub const fn default_shutdown_on_farming_finished() -> bool {
    false
}

/// App ids known to be mispriced bundles/trailers that shouldn't be farmed.
pub fn default_blacklist() -> Vec<u32> {
    vec![303_700, 335_590, 368_020]
}

pub const fn default_statistics() -> bool {
    true
}

pub const fn default_farming_order() -> FarmingOrder {
    FarmingOrder::CardsRemainingAscending
}

pub const fn default_max_games_played_concurrently() -> u8 {
    32
}

pub const fn default_hours_until_card_drops() -> f32 {
    2.0
}
