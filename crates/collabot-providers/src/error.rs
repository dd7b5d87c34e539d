// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Raised by [`crate::ProviderRegistry::register`] (spec §16 open question
/// 3: an explicit empty `acceptedTypes` list is rejected rather than
/// silently meaning "accept nothing").
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("provider '{0}' is already registered")]
    DuplicateId(String),
    #[error(
        "provider '{0}' declared an empty acceptedTypes list; omit the field to accept all, \
         or list at least one type"
    )]
    EmptyAcceptedTypes(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider '{0}' is not registered")]
    UnknownProvider(String),
    #[error("provider '{0}' failed to start: {1}")]
    StartFailed(String, String),
    #[error("provider '{0}' failed to stop: {1}")]
    StopFailed(String, String),
    #[error("provider '{0}' failed to send: {1}")]
    SendFailed(String, String),
}
