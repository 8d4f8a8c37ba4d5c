//! Provider catalog
//!
//! Every supported upstream is a variant of [`ProviderId`]. Each variant maps
//! to one immutable, `'static` [`ProviderConfig`] describing how to talk to it:
//! where to send requests, how to authenticate, and where the generated text
//! lives in streamed and buffered responses. The catalog is plain data, so it
//! is freely shared across concurrent calls.

use crate::json_path::{JsonPath, PathSegment};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical provider identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAI,
    DeepSeek,
    Gemini,
    /// xAI Grok
    Grok,
    /// Anthropic Claude
    Anthropic,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::OpenAI,
        ProviderId::DeepSeek,
        ProviderId::Gemini,
        ProviderId::Grok,
        ProviderId::Anthropic,
    ];

    /// Parse a free-form provider name, folding aliases case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAI),
            "deepseek" => Ok(ProviderId::DeepSeek),
            "gemini" => Ok(ProviderId::Gemini),
            "grok" | "xai" => Ok(ProviderId::Grok),
            "anthropic" | "claude" => Ok(ProviderId::Anthropic),
            _ => Err(Error::UnsupportedProvider(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAI => "openai",
            ProviderId::DeepSeek => "deepseek",
            ProviderId::Gemini => "gemini",
            ProviderId::Grok => "grok",
            ProviderId::Anthropic => "anthropic",
        }
    }

    pub fn config(&self) -> &'static ProviderConfig {
        match self {
            ProviderId::OpenAI => &OPENAI,
            ProviderId::DeepSeek => &DEEPSEEK,
            ProviderId::Gemini => &GEMINI,
            ProviderId::Grok => &GROK,
            ProviderId::Anthropic => &ANTHROPIC,
        }
    }

    /// Request-body dialect spoken by this provider
    pub fn dialect(&self) -> WireDialect {
        match self {
            ProviderId::OpenAI | ProviderId::DeepSeek | ProviderId::Grok => WireDialect::OpenAIChat,
            ProviderId::Gemini => WireDialect::GeminiContents,
            ProviderId::Anthropic => WireDialect::AnthropicMessages,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ProviderId::parse(s)
    }
}

/// Resolve a free-form provider name to its immutable configuration.
pub fn resolve(name: &str) -> Result<&'static ProviderConfig> {
    ProviderId::parse(name).map(|id| id.config())
}

/// Request envelope families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireDialect {
    /// `{model, messages, max_tokens, temperature, stream}`
    OpenAIChat,
    /// `{contents: [{role, parts}], generationConfig}`
    GeminiContents,
    /// `{model, max_tokens, messages}`
    AnthropicMessages,
}

/// How the API key is attached to an outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    BearerHeader,
    /// Key header plus a fixed version header
    CustomHeaderPair {
        key_header: &'static str,
        version_header: &'static str,
        version: &'static str,
    },
    /// Key carried in the URL query string
    QueryParam { name: &'static str },
}

/// Immutable per-provider wire configuration
#[derive(Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    pub id: ProviderId,
    pub base_url: &'static str,
    pub auth_style: AuthStyle,
    /// Path appended to the base URL; `{model}` is substituted
    pub endpoint: &'static str,
    /// Endpoint used for streamed calls when it differs from `endpoint`
    pub stream_endpoint: Option<&'static str>,
    pub supports_native_streaming: bool,
    /// Literal payload that ends a stream successfully, if the provider sends one
    pub stream_terminator: Option<&'static str>,
    pub delta_text_path: Option<JsonPath>,
    pub final_text_path: JsonPath,
}

const OPENAI_DELTA: JsonPath = JsonPath(&[
    PathSegment::Key("choices"),
    PathSegment::Index(0),
    PathSegment::Key("delta"),
    PathSegment::Key("content"),
]);

const OPENAI_FINAL: JsonPath = JsonPath(&[
    PathSegment::Key("choices"),
    PathSegment::Index(0),
    PathSegment::Key("message"),
    PathSegment::Key("content"),
]);

const GEMINI_TEXT: JsonPath = JsonPath(&[
    PathSegment::Key("candidates"),
    PathSegment::Index(0),
    PathSegment::Key("content"),
    PathSegment::Key("parts"),
    PathSegment::Index(0),
    PathSegment::Key("text"),
]);

const ANTHROPIC_FINAL: JsonPath = JsonPath(&[
    PathSegment::Key("content"),
    PathSegment::Index(0),
    PathSegment::Key("text"),
]);

const DONE: &str = "[DONE]";

static OPENAI: ProviderConfig = ProviderConfig {
    id: ProviderId::OpenAI,
    base_url: "https://api.openai.com/v1",
    auth_style: AuthStyle::BearerHeader,
    endpoint: "/chat/completions",
    stream_endpoint: None,
    supports_native_streaming: true,
    stream_terminator: Some(DONE),
    delta_text_path: Some(OPENAI_DELTA),
    final_text_path: OPENAI_FINAL,
};

static DEEPSEEK: ProviderConfig = ProviderConfig {
    id: ProviderId::DeepSeek,
    base_url: "https://api.deepseek.com",
    auth_style: AuthStyle::BearerHeader,
    endpoint: "/chat/completions",
    stream_endpoint: None,
    supports_native_streaming: true,
    stream_terminator: Some(DONE),
    delta_text_path: Some(OPENAI_DELTA),
    final_text_path: OPENAI_FINAL,
};

static GROK: ProviderConfig = ProviderConfig {
    id: ProviderId::Grok,
    base_url: "https://api.x.ai/v1",
    auth_style: AuthStyle::BearerHeader,
    endpoint: "/chat/completions",
    stream_endpoint: None,
    supports_native_streaming: true,
    stream_terminator: Some(DONE),
    delta_text_path: Some(OPENAI_DELTA),
    final_text_path: OPENAI_FINAL,
};

static GEMINI: ProviderConfig = ProviderConfig {
    id: ProviderId::Gemini,
    base_url: "https://generativelanguage.googleapis.com/v1beta",
    auth_style: AuthStyle::QueryParam { name: "key" },
    endpoint: "/models/{model}:generateContent",
    stream_endpoint: Some("/models/{model}:streamGenerateContent?alt=sse"),
    supports_native_streaming: true,
    // Gemini closes the connection instead of sending a terminator
    stream_terminator: None,
    delta_text_path: Some(GEMINI_TEXT),
    final_text_path: GEMINI_TEXT,
};

static ANTHROPIC: ProviderConfig = ProviderConfig {
    id: ProviderId::Anthropic,
    base_url: "https://api.anthropic.com",
    auth_style: AuthStyle::CustomHeaderPair {
        key_header: "x-api-key",
        version_header: "anthropic-version",
        version: "2023-06-01",
    },
    endpoint: "/v1/messages",
    stream_endpoint: None,
    supports_native_streaming: false,
    stream_terminator: None,
    delta_text_path: None,
    final_text_path: ANTHROPIC_FINAL,
};

impl ProviderConfig {
    /// Every catalog entry, in canonical order
    pub fn all() -> impl Iterator<Item = &'static ProviderConfig> {
        ProviderId::ALL.iter().map(|id| id.config())
    }

    /// Endpoint path (and fixed query) for the call mode.
    ///
    /// `{model}` is left in place; callers substitute it per path segment so
    /// the model name is percent-encoded rather than spliced into the URL.
    pub fn endpoint_template(&self, streaming: bool) -> &'static str {
        if streaming {
            self.stream_endpoint.unwrap_or(self.endpoint)
        } else {
            self.endpoint
        }
    }
}

/// Deployment-supplied secret and optional base-URL override for one provider
#[derive(Clone)]
pub struct ProviderCredentials {
    api_key: SecretString,
    base_url: Option<String>,
}

impl ProviderCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: None,
        }
    }

    /// Set the base URL (for proxies and test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Configured base URL, or the catalog default
    pub fn base_url<'a>(&'a self, config: &ProviderConfig) -> &'a str {
        self.base_url.as_deref().unwrap_or(config.base_url)
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests;
