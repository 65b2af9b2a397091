//! Per-bot configuration: one `<bot_name>.xml` document per account.

use super::defaults::{
    default_blacklist, default_card_drops_restricted, default_enabled, default_farming_order,
    default_hours_until_card_drops, default_max_games_played_concurrently, default_null_string,
    default_parental_pin, default_shutdown_on_farming_finished, default_statistics,
    default_steam_id,
};
use crate::game::FarmingOrder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One bot's persisted configuration, deserialized from XML.
///
/// Unknown elements are ignored by the underlying XML deserializer rather
/// than rejected, mirroring the process-wide config's `#[serde(default)]`
/// tolerance for missing fields.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename = "BotConfig")]
pub struct BotConfig {
    #[serde(rename = "Enabled", default = "default_enabled")]
    pub enabled: bool,

    #[serde(rename = "SteamLogin", default = "default_null_string")]
    pub steam_login: String,
    #[serde(rename = "SteamPassword", default = "default_null_string")]
    pub steam_password: String,
    #[serde(rename = "SteamNickname", default = "default_null_string")]
    pub steam_nickname: String,
    #[serde(rename = "SteamApiKey", default = "default_null_string")]
    pub steam_api_key: String,
    #[serde(rename = "SteamParentalPIN", default = "default_parental_pin")]
    pub steam_parental_pin: String,

    #[serde(rename = "SteamMasterID", default = "default_steam_id")]
    pub steam_master_id: u64,
    #[serde(rename = "SteamMasterClanID", default = "default_steam_id")]
    pub steam_master_clan_id: u64,

    #[serde(rename = "CardDropsRestricted", default = "default_card_drops_restricted")]
    pub card_drops_restricted: bool,
    #[serde(
        rename = "ShutdownOnFarmingFinished",
        default = "default_shutdown_on_farming_finished"
    )]
    pub shutdown_on_farming_finished: bool,

    #[serde(
        rename = "Blacklist",
        default = "default_blacklist",
        deserialize_with = "deserialize_csv_u32",
        serialize_with = "serialize_csv_u32"
    )]
    pub blacklist: Vec<u32>,

    #[serde(rename = "Statistics", default = "default_statistics")]
    pub statistics: bool,

    #[serde(rename = "FarmingOrder", default = "default_farming_order")]
    pub farming_order: FarmingOrder,

    #[serde(
        rename = "MaxGamesPlayedConcurrently",
        default = "default_max_games_played_concurrently"
    )]
    pub max_games_played_concurrently: u8,

    #[serde(rename = "HoursUntilCardDrops", default = "default_hours_until_card_drops")]
    pub hours_until_card_drops: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            steam_login: default_null_string(),
            steam_password: default_null_string(),
            steam_nickname: default_null_string(),
            steam_api_key: default_null_string(),
            steam_parental_pin: default_parental_pin(),
            steam_master_id: default_steam_id(),
            steam_master_clan_id: default_steam_id(),
            card_drops_restricted: default_card_drops_restricted(),
            shutdown_on_farming_finished: default_shutdown_on_farming_finished(),
            blacklist: default_blacklist(),
            statistics: default_statistics(),
            farming_order: default_farming_order(),
            max_games_played_concurrently: default_max_games_played_concurrently(),
            hours_until_card_drops: default_hours_until_card_drops(),
        }
    }
}

impl BotConfig {
    /// `SteamLogin`/`SteamPassword`/`SteamNickname`/`SteamApiKey` use the
    /// sentinel string `"null"` to mean "not configured, prompt instead".
    pub fn needs_interactive_login(&self) -> bool {
        is_null_sentinel(&self.steam_login) || is_null_sentinel(&self.steam_password)
    }

    pub fn has_nickname(&self) -> bool {
        !is_null_sentinel(&self.steam_nickname)
    }

    pub fn needs_parental_pin(&self) -> bool {
        self.steam_parental_pin.trim() == "null"
    }
}

fn is_null_sentinel(value: &str) -> bool {
    value.trim() == "null"
}

fn deserialize_csv_u32<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_csv_u32(&raw).map_err(serde::de::Error::custom)
}

fn serialize_csv_u32<S>(values: &[u32], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let joined = values
        .iter()
        .map(std::string::ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    serializer.serialize_str(&joined)
}

fn parse_csv_u32(raw: &str) -> Result<Vec<u32>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .parse::<u32>()
                .map_err(|e| format!("invalid app id '{segment}' in blacklist: {e}"))
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum BotConfigError {
    #[error("failed to read bot config directory '{dir}': {source}")]
    ReadDir {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read bot config file '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse bot config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: quick_xml::DeError,
    },
}

/// Scan `dir` for `*.xml` files and parse each into a `BotConfig`, keyed by
/// file stem (the bot's name). A single malformed file is skipped with a
/// logged error rather than aborting the whole scan.
pub fn load_all(dir: &Path) -> Result<HashMap<String, BotConfig>, BotConfigError> {
    let mut configs = HashMap::new();

    let entries = std::fs::read_dir(dir).map_err(|source| BotConfigError::ReadDir {
        dir: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        match load_one(&path) {
            Ok(config) => {
                configs.insert(stem.to_string(), config);
            }
            Err(err) => {
                tracing::error!(bot_name = stem, error = %err, "failed to load bot config, skipping");
            }
        }
    }

    Ok(configs)
}

fn load_one(path: &Path) -> Result<BotConfig, BotConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| BotConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;

    quick_xml::de::from_str(&raw).map_err(|source| BotConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_table() {
        let config = BotConfig::default();
        assert!(config.enabled);
        assert_eq!(config.steam_login, "null");
        assert_eq!(config.steam_parental_pin, "0");
        assert_eq!(config.blacklist, vec![303_700, 335_590, 368_020]);
        assert_eq!(config.max_games_played_concurrently, 32);
        assert!((config.hours_until_card_drops - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.farming_order, FarmingOrder::CardsRemainingAscending);
    }

    #[test]
    fn parses_minimal_document() {
        let xml = r#"
            <BotConfig>
                <Enabled>true</Enabled>
                <SteamLogin>alice</SteamLogin>
                <SteamPassword>hunter2</SteamPassword>
                <SteamMasterID>12345</SteamMasterID>
                <CardDropsRestricted>true</CardDropsRestricted>
                <Blacklist>303700,12345</Blacklist>
            </BotConfig>
        "#;

        let config: BotConfig = quick_xml::de::from_str(xml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.steam_login, "alice");
        assert_eq!(config.steam_master_id, 12345);
        assert!(config.card_drops_restricted);
        assert_eq!(config.blacklist, vec![303_700, 12345]);
        // untouched fields fall back to defaults
        assert_eq!(config.statistics, default_statistics());
    }

    #[test]
    fn ignores_unknown_elements() {
        let xml = r#"
            <BotConfig>
                <Enabled>true</Enabled>
                <SomeFutureKey>whatever</SomeFutureKey>
            </BotConfig>
        "#;
        let config: BotConfig = quick_xml::de::from_str(xml).unwrap();
        assert!(config.enabled);
    }

    #[test]
    fn needs_interactive_login_when_credentials_are_null() {
        let config = BotConfig::default();
        assert!(config.needs_interactive_login());

        let config = BotConfig {
            steam_login: "alice".into(),
            steam_password: "hunter2".into(),
            ..BotConfig::default()
        };
        assert!(!config.needs_interactive_login());
    }

    #[test]
    fn load_all_scans_xml_files_and_skips_malformed_ones() {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(
            dir.path().join("alice.xml"),
            r#"<BotConfig><Enabled>true</Enabled><SteamMasterID>1</SteamMasterID></BotConfig>"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("bob.xml"),
            r#"<BotConfig><Enabled>false</Enabled></BotConfig>"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("carol.xml"), "<BotConfig><Unclosed>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me, not xml").unwrap();

        let configs = load_all(dir.path()).unwrap();

        assert_eq!(configs.len(), 2);
        assert!(configs["alice"].enabled);
        assert!(!configs["bob"].enabled);
        assert!(!configs.contains_key("carol"));
        assert!(!configs.contains_key("notes"));
    }

    #[test]
    fn load_all_on_missing_directory_errors() {
        let result = load_all(Path::new("/nonexistent/cardfarm-bots-config-dir"));
        assert!(matches!(result, Err(BotConfigError::ReadDir { .. })));
    }
}
