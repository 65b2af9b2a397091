//! The `PlatformClient` capability: connection, login, callbacks, and play
//! operations against the game-distribution platform.
//!
//! The concrete wire protocol is out of scope (see the crate's top-level
//! documentation): this module defines the capability's *interface* plus a
//! deterministic in-memory mock used by the scheduler's tests. Production
//! wiring would plug in a real implementation behind the same trait.

mod mock;

pub use mock::MockPlatformClient;

use async_trait::async_trait;
use thiserror::Error;

/// A platform account identifier (distinct from a bot's local config name).
pub type SteamId = u64;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("not connected")]
    NotConnected,
    #[error("already connected")]
    AlreadyConnected,
    #[error("connection timed out")]
    Timeout,
    #[error("platform transport error: {0}")]
    Transport(String),
}

/// Outcome of a connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectResult {
    Ok,
    NoConnection,
    Timeout,
}

/// Outcome of a log-on attempt, modeling the platform's `EResult` subset
/// relevant to the bot's recovery logic (see `Bot::on_logged_on`). `Ok`
/// carries the account's own `SteamId`, the only point in the callback
/// surface where a bot learns the id of the account it just logged into
/// (distinct from `BotConfig::steam_master_id`, the chat-command issuer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOnResult {
    Ok(SteamId),
    AccountLogonDenied,
    AccountLoginDeniedNeedTwoFactor,
    InvalidPassword,
    ServiceUnavailable,
    Timeout,
    TryAnotherCm,
    /// Catch-all for any other non-OK result: handled by shutting the bot down.
    Other(u32),
}

impl LogOnResult {
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Outcome of a key-redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseResult {
    pub ok: bool,
    pub items: Vec<String>,
}

impl PurchaseResult {
    /// Render the way `Bot` relays a redeem outcome to the master in chat.
    pub fn summarize(&self) -> String {
        let status = if self.ok { "Ok" } else { "Failed" };
        if self.items.is_empty() {
            format!("Status: {status}")
        } else {
            format!("Status: {status} | Items: {}", self.items.join(", "))
        }
    }
}

/// An incoming friendship request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendRequest {
    pub steam_id: SteamId,
    pub is_clan_invite: bool,
}

/// One chunk of a sentry-blob update delivered by the platform.
#[derive(Debug, Clone)]
pub struct MachineAuthChunk {
    pub job_id: u64,
    pub file_name: String,
    pub offset: u64,
    pub data: Vec<u8>,
}

/// The kind of an out-of-band notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NewItems,
    /// A game was newly licensed (purchased, gifted, or granted) and should
    /// be picked up by the farming scheduler.
    NewLicense(u32),
    Trading,
    Other(u32),
}

/// A tagged-union of every callback the platform can deliver to a bot. The
/// per-bot pump loop `match`es on this the way a connection handler dispatches
/// a tagged `ClientMessage`/`ServerMessage` pair.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    Connected(ConnectResult),
    Disconnected,
    LoggedOn(LogOnResult),
    LoggedOff,
    FriendsList(Vec<FriendRequest>),
    ChatMessage { sender: SteamId, text: String },
    MachineAuth(MachineAuthChunk),
    Notification(NotificationKind),
    PurchaseResponse(PurchaseResult),
}

/// Credentials and 2FA material supplied at login time.
#[derive(Debug, Clone, Default)]
pub struct LogOnCredentials {
    pub login: String,
    pub password: String,
    pub auth_code: Option<String>,
    pub two_factor_code: Option<String>,
    pub sentry_file_hash: Option<[u8; 20]>,
}

/// The capability a `Bot` drives: connect/disconnect, log on, subscribe to
/// callbacks, and issue imperative operations.
///
/// Implementations own the underlying network connection and are not `Sync`
/// across bots — each bot owns exactly one instance.
#[async_trait]
pub trait PlatformClient: Send {
    /// Begin connecting. Resolves once a `Connected` event has been queued;
    /// callers still observe the event through `next_event`.
    async fn connect(&mut self) -> Result<(), PlatformError>;

    /// Tear down the connection. Idempotent.
    async fn disconnect(&mut self);

    async fn log_on(&mut self, credentials: LogOnCredentials) -> Result<(), PlatformError>;

    async fn log_off(&mut self);

    /// Block until the next callback is available.
    async fn next_event(&mut self) -> Option<PlatformEvent>;

    async fn set_persona_name(&mut self, name: &str);

    async fn join_chat(&mut self, clan_id: SteamId);

    async fn send_chat_message(&mut self, recipient: SteamId, text: &str);

    async fn accept_friend(&mut self, steam_id: SteamId);

    async fn remove_friend(&mut self, steam_id: SteamId);

    /// Play a single app id (idle farming of one title).
    async fn play_game(&mut self, app_id: u32);

    /// Play several app ids concurrently (idle farming of multiple titles to
    /// accrue the restricted-account play-hours requirement).
    async fn play_games(&mut self, app_ids: &[u32]);

    /// Stop playing anything.
    async fn stop_playing(&mut self);

    async fn redeem_key(&mut self, key: &str);

    /// Acknowledge a `MachineAuth` chunk once the sentry blob has been
    /// updated and rehashed.
    async fn ack_machine_auth(&mut self, job_id: u64, sha1: [u8; 20]);
}
