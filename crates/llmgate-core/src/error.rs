//! Error types for LLMGate Core

use crate::provider::ProviderId;
use std::fmt;
use thiserror::Error;

/// Why a call stopped before producing a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller cancelled (disconnect, explicit abort)
    Caller,
    /// The overall per-call deadline elapsed
    Deadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Caller => write!(f, "cancelled by caller"),
            CancelReason::Deadline => write!(f, "call deadline elapsed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Provider not configured: {provider} ({reason})")]
    ProviderNotConfigured { provider: ProviderId, reason: String },

    #[error("Provider call failed{} after {attempts} attempt(s): {body}", status.map(|s| format!(" with status {}", s)).unwrap_or_default())]
    ProviderCallFailed {
        /// HTTP status of the last attempt, `None` when no response was received
        status: Option<u16>,
        /// Upstream body (or transport error text), truncated
        body: String,
        attempts: u32,
    },

    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),

    #[error("Request cancelled: {reason}")]
    Cancelled { reason: CancelReason },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Errors caused by caller input rather than the upstream provider
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::UnsupportedProvider(_) | Error::InvalidRequest(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    pub fn cancelled(reason: CancelReason) -> Self {
        Error::Cancelled { reason }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
