//! LLMGate Egress
//!
//! This crate talks to the upstream LLM providers:
//! - Provider-native payload building
//! - Pooled HTTP transport with bounded retry
//! - Streamed delta aggregation and buffered envelope extraction
//! - The `HttpGateway` pipeline and the empty-output fallback orchestrator

pub mod client;
pub mod envelope;
pub mod fallback;
pub mod gateway;
pub mod payload;
pub mod streaming;
pub mod transport;

pub use client::{HttpClientConfig, create_client};
pub use fallback::{SolvePhase, SolvePrompt, SolveRequest, solve_with_fallback};
pub use gateway::HttpGateway;
pub use payload::PreparedRequest;
pub use streaming::{StreamOutcome, Termination};
pub use transport::{HttpTransport, RawBody, RawResponse, ResponseMode};

use llmgate_core::{CancelReason, FailureClass};
use thiserror::Error;

/// Longest upstream body carried in an error
pub const MAX_ERROR_BODY_BYTES: usize = 2048;

/// Failure of a single upstream attempt
#[derive(Debug, Error)]
pub enum EgressError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Provider returned {status_code}: {message}")]
    ProviderError { status_code: u16, message: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Request cancelled: {0}")]
    Cancelled(CancelReason),
}

impl EgressError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            EgressError::HttpError(e) if e.is_builder() || e.is_redirect() => FailureClass::Fatal,
            EgressError::HttpError(_) => FailureClass::Network,
            EgressError::ProviderError { status_code, .. } => FailureClass::Status(*status_code),
            EgressError::ConfigError(_) | EgressError::Cancelled(_) => FailureClass::Fatal,
        }
    }

    /// Convert into the caller-visible error once no more attempts will be made.
    pub fn into_core(self, attempts: u32) -> llmgate_core::Error {
        match self {
            EgressError::HttpError(e) => llmgate_core::Error::ProviderCallFailed {
                status: e.status().map(|s| s.as_u16()),
                body: truncate_body(&e.to_string()),
                attempts,
            },
            EgressError::ProviderError {
                status_code,
                message,
            } => llmgate_core::Error::ProviderCallFailed {
                status: Some(status_code),
                body: truncate_body(&message),
                attempts,
            },
            EgressError::ConfigError(msg) => llmgate_core::Error::Config(msg),
            EgressError::Cancelled(reason) => llmgate_core::Error::cancelled(reason),
        }
    }
}

impl From<EgressError> for llmgate_core::Error {
    fn from(err: EgressError) -> Self {
        err.into_core(1)
    }
}

pub type Result<T> = std::result::Result<T, EgressError>;

/// Cut an upstream body down to [`MAX_ERROR_BODY_BYTES`] on a char boundary.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
