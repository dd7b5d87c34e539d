// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI-facing error types, grounded on the teacher's `client::ClientError`.

use collabot_daemon::protocol::RpcError;
use collabot_daemon::protocol_wire::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("daemon rejected the request: {0} (code {1})")]
    Rejected(String, i64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine state directory")]
    NoStateDir,
}

impl ClientError {
    pub fn from_rpc(error: RpcError) -> Self {
        Self::Rejected(error.message, error.code)
    }
}
