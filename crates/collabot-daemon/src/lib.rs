// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Collabot daemon: owns the socket listener, the draft-session
//! bridge, and daemon bootstrap configuration. Split into a library target
//! (reused by `collabot-cli`, which talks the same `protocol`/
//! `protocol_wire` wire format as a one-shot client) and the `collabotd`
//! binary.

pub mod config;
pub mod draft_bridge;
pub mod env;
pub mod listener;
pub mod protocol;
pub mod protocol_wire;
pub mod socket_provider;

pub use config::{Config, ConfigError};
pub use draft_bridge::DraftInboundHandler;
pub use listener::{serve, DaemonCtx};
pub use socket_provider::SocketProvider;
