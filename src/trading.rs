//! Trading notification routing.
//!
//! Out of scope in depth: the platform's trade-offer matching logic is not
//! implemented here. This module exists so `Bot`'s callback dispatch stays
//! total — a `Notification(kind=Trading)` callback has somewhere to go — and
//! so the seam is visible for a future implementation.

use tracing::debug;

/// No-op acceptor for trade notifications. Logs and returns; a real
/// implementation would inspect the pending trade offer and decide whether
/// to accept it.
pub fn on_trade_notification(bot_name: &str) {
    debug!(bot_name, "trade notification received, routing not implemented");
}
