#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::similar_names
)]

//! # Cardfarm Bots
//!
//! Idle-time farming of trading-card drops on a game-distribution platform,
//! for one or more accounts ("bots") running concurrently in a single process.
//!
//! The core of the crate is the per-bot farming scheduler and session state
//! machine: [`bot`] drives the connection/authentication/reconnection state
//! machine, [`farmer`] implements the two farming algorithms, [`registry`]
//! coordinates start/stop/shutdown across bots, and [`command`] dispatches
//! chat commands from the master user.

/// The per-bot session supervisor: callback pump, login state machine, shutdown.
pub mod bot;

/// Chat command parsing and dispatch, including redeem-result correlation.
pub mod command;

/// Layered configuration: per-bot XML and process-wide JSON/env.
pub mod config;

/// The per-bot farming scheduler: round algorithm, badge-page parsing.
pub mod farmer;

/// The `Game` value type and farming-order sorting.
pub mod game;

/// Structured logging configuration.
pub mod logging;

/// The `PlatformClient` capability: connection, login, callbacks, play operations.
pub mod platform;

/// Process-wide bot registry.
pub mod registry;

/// Retry-with-backoff utilities, reused for transient web/platform errors.
pub mod retry;

/// Global connect-throttle shared by all bots in the process.
pub mod throttle;

/// Trading notification routing (out of scope in depth; seam only).
pub mod trading;

/// The `WebClient` capability: badge/card page fetch and HTML parsing.
pub mod web;
