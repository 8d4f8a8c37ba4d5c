//! LLMGate Core Types and Traits
//!
//! This crate provides the fundamental types shared by every LLMGate crate:
//! - Canonical chat request/response types
//! - The provider catalog (ids, aliases, wire capabilities)
//! - Stream frame classification and retry decisions
//! - The `Gateway` trait and core error types

pub mod chat;
pub mod error;
pub mod gateway;
pub mod json_path;
pub mod provider;
pub mod retry;
pub mod stream;

pub use chat::{CanonicalChatRequest, CanonicalChatResponse, ChatTurn, Role};
pub use error::{CancelReason, Error, Result};
pub use gateway::Gateway;
pub use json_path::{JsonPath, PathSegment};
pub use provider::{AuthStyle, ProviderConfig, ProviderCredentials, ProviderId, resolve};
pub use retry::{FailureClass, RetryDecision, RetryPolicy};
pub use stream::StreamFrame;
