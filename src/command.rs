//! Chat command parsing and dispatch for the master user, including
//! redeem-result correlation via a per-bot one-shot slot.

use crate::bot::Bot;
use crate::platform::PurchaseResult;
use crate::registry::BotRegistry;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const REDEEM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("redeem timed out waiting for a purchase response")]
    RedeemTimedOut,
    #[error("redeem channel closed before a purchase response arrived")]
    RedeemChannelClosed,
}

/// Offsets (from the start of the key) that must hold a dash for a 17- or
/// 29-character key.
fn is_valid_cd_key(candidate: &str) -> bool {
    let len = candidate.chars().count();
    if len != 17 && len != 29 {
        return false;
    }
    let chars: Vec<char> = candidate.chars().collect();
    [5, 11, 17, 23]
        .iter()
        .filter(|&&i| i < len)
        .all(|&i| chars[i] == '-')
}

/// Arm a redeem, issue it, and wait (bounded) for the matching
/// `PurchaseResponse`. Restores `answer_directly` regardless of outcome.
pub async fn purchase_result_async(bot: &Arc<Bot>, key: &str) -> Result<PurchaseResult, CommandError> {
    let rx = bot.register_pending_redeem().await;
    bot.redeem_key(key);

    let outcome = tokio::time::timeout(REDEEM_TIMEOUT, rx).await;
    bot.restore_answer_directly();

    match outcome {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(_)) => Err(CommandError::RedeemChannelClosed),
        Err(_) => Err(CommandError::RedeemTimedOut),
    }
}

/// Dispatch one chat message from `bot`'s master. Returns the reply text, if
/// any, to send back to the master.
pub async fn handle(bot: &Arc<Bot>, text: &str) -> Option<String> {
    let trimmed = text.trim();

    if is_valid_cd_key(trimmed) {
        bot.redeem_key(trimmed);
        return None;
    }

    if trimmed.lines().count() > 1 && trimmed.lines().all(|line| line.trim_start().starts_with('-')) {
        return Some(fan_out_redeem(bot, trimmed).await);
    }

    let Some(rest) = trimmed.strip_prefix('!') else {
        return None;
    };
    let mut parts = rest.split_whitespace();
    let command = parts.next()?;
    let args: Vec<&str> = parts.collect();

    match command {
        "exit" => {
            if let Some(registry) = registry_of(bot) {
                registry.shutdown_all().await;
            }
            Some("Shutting down.".to_string())
        }
        "restart" => Some("Restart requested; process-level restart is out of crate scope.".to_string()),
        "farm" => match args.first() {
            None => {
                bot.farmer().start_farming();
                Some(format!("{}: farming started.", bot.name))
            }
            Some(name) => match resolve(bot, name) {
                Some(target) => {
                    target.farmer().start_farming();
                    Some(format!("{name}: farming started."))
                }
                None => Some(format!("{name}: no such bot.")),
            },
        },
        "status" => match args.first() {
            None => Some(bot.status_summary().await),
            Some(&"all") => Some(status_all(bot).await),
            Some(name) => match resolve(bot, name) {
                Some(target) => Some(target.status_summary().await),
                None => Some(format!("{name}: no such bot.")),
            },
        },
        "start" => match args.first() {
            Some(name) => match resolve(bot, name) {
                Some(target) => {
                    target.start().await;
                    Some(format!("{name}: starting."))
                }
                None => Some(format!("{name}: no such bot.")),
            },
            None => Some("!start requires a bot name.".to_string()),
        },
        "stop" => match args.first() {
            None => {
                bot.shutdown().await;
                Some(format!("{}: stopped.", bot.name))
            }
            Some(name) => match resolve(bot, name) {
                Some(target) => {
                    target.shutdown().await;
                    Some(format!("{name}: stopped."))
                }
                None => Some(format!("{name}: no such bot.")),
            },
        },
        "redeem" => match args.as_slice() {
            [key] => {
                bot.redeem_key(key);
                None
            }
            [name, key] => match resolve(bot, name) {
                Some(target) => match purchase_result_async(&target, key).await {
                    Ok(result) => Some(format!("{name}: {}", result.summarize())),
                    Err(err) => {
                        warn!(bot_name = %bot.name, target = %name, error = %err, "redeem correlation failed");
                        Some(format!("{name}: {err}"))
                    }
                },
                None => Some(format!("{name}: no such bot.")),
            },
            _ => Some("Usage: !redeem <key> or !redeem <name> <key>".to_string()),
        },
        _ => None,
    }
}

fn registry_of(bot: &Arc<Bot>) -> Option<Arc<BotRegistry>> {
    bot.registry_handle().upgrade()
}

fn resolve(bot: &Arc<Bot>, name: &str) -> Option<Arc<Bot>> {
    registry_of(bot)?.get(name)
}

async fn status_all(bot: &Arc<Bot>) -> String {
    let Some(registry) = registry_of(bot) else {
        return bot.status_summary().await;
    };
    let mut lines = Vec::new();
    for (_, entry) in registry.snapshot() {
        lines.push(entry.status_summary().await);
    }
    lines.join("\n")
}

/// Pair each line's key (stripped of its leading `-`) with a bot in registry
/// order via `zip`, not indexing — a short key list leaves trailing bots
/// untouched, a short bot list leaves trailing keys unredeemed; both are
/// silently dropped rather than causing an out-of-bounds panic.
async fn fan_out_redeem(bot: &Arc<Bot>, message: &str) -> String {
    let Some(registry) = registry_of(bot) else {
        return "No registry available to fan out redeem.".to_string();
    };

    let keys: Vec<&str> = message.lines().map(|line| line.trim_start().trim_start_matches('-').trim()).collect();
    let bots = registry.snapshot();

    let mut replies = Vec::new();
    for (key, (name, target)) in keys.iter().zip(bots.iter()) {
        match purchase_result_async(target, key).await {
            Ok(result) => replies.push(format!("{name}: {}", result.summarize())),
            Err(err) => replies.push(format!("{name}: {err}")),
        }
    }
    replies.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_key_lengths_and_dashes() {
        assert!(is_valid_cd_key("ABCDE-FGHIJ-KLMNO"));
        assert!(!is_valid_cd_key("ABCDEFGHIJKLMNOPQ"));
        assert!(!is_valid_cd_key("too-short"));
    }

    #[test]
    fn valid_key_29_chars() {
        let key = "ABCDE-FGHIJ-KLMNO-PQRST-UVWXY";
        assert_eq!(key.len(), 29);
        assert!(is_valid_cd_key(key));
    }

    #[tokio::test]
    async fn status_command_reports_stopped_by_default() {
        let bot = crate::bot::test_support::test_bot("alice");
        let reply = handle(&bot, "!status").await;
        assert_eq!(reply, Some("alice: stopped".to_string()));
    }

    #[tokio::test]
    async fn unknown_command_replies_nothing() {
        let bot = crate::bot::test_support::test_bot("alice");
        let reply = handle(&bot, "!bogus").await;
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn bare_key_is_redeemed_silently() {
        let bot = crate::bot::test_support::test_bot("alice");
        let reply = handle(&bot, "ABCDE-FGHIJ-KLMNO").await;
        assert_eq!(reply, None);
    }
}
