//! Canonical request and response types

use crate::provider::ProviderId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Role of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Gemini's name for the assistant side
    Model,
}

/// A single turn in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }
}

/// Provider-agnostic generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalChatRequest {
    pub provider: ProviderId,

    /// Model identifier, passed through to the provider verbatim
    pub model: String,

    /// Ordered conversation turns
    pub turns: Vec<ChatTurn>,

    /// Maximum number of tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Whether to ask the provider for a streamed response
    pub want_streaming: bool,
}

pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

impl CanonicalChatRequest {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            turns: Vec::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            want_streaming: false,
        }
    }

    pub fn with_turn(mut self, turn: ChatTurn) -> Self {
        self.turns.push(turn);
        self
    }

    pub fn with_system(self, text: impl Into<String>) -> Self {
        self.with_turn(ChatTurn::system(text))
    }

    pub fn with_user(self, text: impl Into<String>) -> Self {
        self.with_turn(ChatTurn::user(text))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn streaming(mut self, want_streaming: bool) -> Self {
        self.want_streaming = want_streaming;
        self
    }

    /// Check the invariants every provider relies on.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::InvalidRequest("model must not be empty".to_string()));
        }
        if !self.turns.iter().any(|t| t.role == Role::User) {
            return Err(Error::InvalidRequest(
                "request must contain at least one user turn".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(Error::InvalidRequest("max_tokens must be positive".to_string()));
        }
        Ok(())
    }

    /// Texts of all turns with the given role, in order
    pub fn texts(&self, role: Role) -> impl Iterator<Item = &str> {
        self.turns
            .iter()
            .filter(move |t| t.role == role)
            .map(|t| t.text.as_str())
    }
}

/// Provider-agnostic generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalChatResponse {
    /// Generated text; empty when the provider produced nothing
    pub text: String,
    pub provider: ProviderId,
    pub model: String,
    pub was_fallback_used: bool,
}

impl CanonicalChatResponse {
    pub fn new(provider: ProviderId, model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider,
            model: model.into(),
            was_fallback_used: false,
        }
    }

    /// True when no visible text was generated
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
