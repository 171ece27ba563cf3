// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for iotprint.

use thiserror::Error;

/// Classification tag carried by transport-level failures.
pub const SERVER_KIND: &str = "server";

/// Top-level error type for all iotprint operations.
#[derive(Debug, Error)]
pub enum IotPrintError {
    // -- Transport errors --
    /// The channel itself (server, RPC endpoint) is unreachable.
    #[error("server unavailable: {0}")]
    Server(String),

    #[error("device lookup failed: {0}")]
    DeviceLookup(String),

    /// Cached printers the server no longer knows about.
    #[error("selected printers no longer available: {}", .missing.join(", "))]
    StaleSelection { missing: Vec<String> },

    #[error("report rendering failed: {0}")]
    Render(String),

    #[error("socket job queue rejected the job: {0}")]
    SocketQueue(String),

    // -- Device errors --
    #[error("device {identifier} reported an error: {message}")]
    Device { identifier: String, message: String },

    #[error("device {identifier} did not acknowledge within {secs}s")]
    DeviceTimeout { identifier: String, secs: u64 },

    #[error("device channel closed: {0}")]
    ChannelClosed(String),

    // -- Selection --
    #[error("printer selection wizard failed: {0}")]
    Wizard(String),

    #[error("invalid idempotency token: {0}")]
    InvalidToken(String),

    #[error("random number generation failed: {0}")]
    Entropy(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IotPrintError {
    /// Classification tag of this error.
    ///
    /// `Some("server")` marks a transport-level failure; every other error is
    /// unclassified and treated as device-level by the fallback chain. A stale
    /// selection is raised server-side, so it carries the server tag too.
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Self::Server(_) | Self::StaleSelection { .. } => Some(SERVER_KIND),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IotPrintError>;
