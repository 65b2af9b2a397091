#![cfg_attr(not(test), deny(clippy::panic))]

use cardfarm_bots::bot::{Bot, StdinPrompter};
use cardfarm_bots::config::{self, Config};
use cardfarm_bots::logging;
use cardfarm_bots::platform::MockPlatformClient;
use cardfarm_bots::registry::BotRegistry;
use cardfarm_bots::throttle::ConnectThrottle;
use cardfarm_bots::web::HttpWebClient;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Cardfarm Bots -- idle-time trading-card farming across one or more accounts
#[derive(Parser, Debug)]
#[command(name = "cardfarm-bots")]
#[command(about = "Idle-time trading-card farming manager for multiple accounts")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting any bots.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded process-wide configuration as JSON and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = Arc::new(config::load());

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&*cfg)?);
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Bot config dir: {}", cfg.bot_config_dir);
                println!("  Connect throttle: {}s", cfg.connect_throttle_secs);
                println!("  File logging enabled: {}", cfg.logging.enable_file_logging);
                return Ok(());
            }
            Err(err) => {
                eprintln!("Configuration validation failed:\n{err}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    tracing::info!(bot_config_dir = %cfg.bot_config_dir, "starting cardfarm-bots");

    let registry = BotRegistry::new();
    start_enabled_bots(&registry, &cfg).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    registry.shutdown_all().await;

    Ok(())
}

async fn start_enabled_bots(registry: &Arc<BotRegistry>, cfg: &Config) -> anyhow::Result<()> {
    let bot_configs = config::bot::load_all(Path::new(&cfg.bot_config_dir))?;
    let throttle = ConnectThrottle::new(Duration::from_secs(cfg.connect_throttle_secs));
    let prompter = Arc::new(StdinPrompter);

    if bot_configs.is_empty() {
        tracing::warn!(dir = %cfg.bot_config_dir, "no bot configs found");
    }

    for (name, bot_config) in bot_configs {
        if !bot_config.enabled {
            tracing::info!(bot_name = %name, "bot disabled, skipping");
            continue;
        }

        // A concrete `PlatformClient` wired to the real distribution platform
        // is outside this crate's scope (see `platform` module docs); the
        // shipped binary runs against the in-memory mock until a host
        // provides a real implementation behind the same trait.
        let platform = Box::new(MockPlatformClient::new());
        let web = Arc::new(HttpWebClient::new(reqwest::Client::new()));

        let bot = Bot::new(
            name.clone(),
            bot_config,
            platform,
            web,
            Arc::downgrade(registry),
            prompter.clone(),
            throttle.clone(),
        );

        if registry.insert_if_absent(name.clone(), bot.clone()) {
            bot.start().await;
        } else {
            tracing::warn!(bot_name = %name, "duplicate bot name, skipping");
        }
    }

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn default_no_flags() {
        let cli = Cli::try_parse_from(["cardfarm-bots"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn validate_config_short_and_long() {
        let cli = Cli::try_parse_from(["cardfarm-bots", "--validate-config"]).unwrap();
        assert!(cli.validate_config);

        let cli = Cli::try_parse_from(["cardfarm-bots", "-c"]).unwrap();
        assert!(cli.validate_config);
    }

    #[test]
    fn print_config_flag() {
        let cli = Cli::try_parse_from(["cardfarm-bots", "--print-config"]).unwrap();
        assert!(cli.print_config);
    }

    #[test]
    fn validate_and_print_config_conflict() {
        let result = Cli::try_parse_from(["cardfarm-bots", "--validate-config", "--print-config"]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be used with"));
    }
}
