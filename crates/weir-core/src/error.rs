// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Weir webhook bridge.

use thiserror::Error;

/// The primary error type used across the Weir pipeline and storage layers.
#[derive(Debug, Error)]
pub enum WeirError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A storage operation exceeded its configured deadline.
    #[error("storage operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The circuit breaker is open; the attempt was rejected without storage I/O.
    #[error("circuit breaker open: storage attempts suspended")]
    CircuitOpen,

    /// A webhook payload could not be mapped into a normalized event.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// HTTP gateway errors (bind failure, server fault).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WeirError {
    /// True for the failure kinds the circuit breaker counts: storage write
    /// errors and storage timeouts. Circuit-open rejections and mapping or
    /// routing faults are not counted.
    pub fn is_breaker_counted(&self) -> bool {
        matches!(self, WeirError::Storage { .. } | WeirError::Timeout { .. })
    }
}
