//! Provider-native request building
//!
//! [`build`] is pure: the same request, config and credentials always give a
//! byte-identical body. The API key only ever ends up in the returned header
//! map or URL, and [`PreparedRequest`]'s `Debug` output masks both.

use bytes::Bytes;
use llmgate_core::{
    AuthStyle, CanonicalChatRequest, ChatTurn, Error, ProviderConfig, ProviderCredentials, Result,
    Role, provider::WireDialect,
};
use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::fmt;

/// A fully built upstream call, ready to hand to the transport
#[derive(Clone)]
pub struct PreparedRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Whether the provider was asked to stream
    pub streaming: bool,
}

impl PreparedRequest {
    /// URL with any credential query value masked, safe for logs
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "key" { "<redacted>".to_string() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        if !pairs.is_empty() {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
        url.to_string()
    }
}

impl fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if value.is_sensitive() {
                    "<redacted>"
                } else {
                    value.to_str().unwrap_or("<binary>")
                };
                (name.as_str(), shown)
            })
            .collect();

        f.debug_struct("PreparedRequest")
            .field("url", &self.redacted_url())
            .field("headers", &headers)
            .field("body_bytes", &self.body.len())
            .field("streaming", &self.streaming)
            .finish()
    }
}

/// Build the provider-native URL, headers and body for `request`.
pub fn build(
    request: &CanonicalChatRequest,
    config: &'static ProviderConfig,
    credentials: &ProviderCredentials,
) -> Result<PreparedRequest> {
    let streaming = request.want_streaming && config.supports_native_streaming;

    let body = match config.id.dialect() {
        WireDialect::OpenAIChat => serde_json::to_vec(&openai_body(request, streaming))?,
        WireDialect::GeminiContents => serde_json::to_vec(&gemini_body(request))?,
        WireDialect::AnthropicMessages => serde_json::to_vec(&anthropic_body(request))?,
    };

    let mut url = endpoint_url(config, credentials, &request.model, streaming)?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if streaming {
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    }

    match config.auth_style {
        AuthStyle::BearerHeader => {
            let value = secret_header(&format!("Bearer {}", credentials.api_key()))?;
            headers.insert(AUTHORIZATION, value);
        }
        AuthStyle::CustomHeaderPair {
            key_header,
            version_header,
            version,
        } => {
            headers.insert(
                HeaderName::from_static(key_header),
                secret_header(credentials.api_key())?,
            );
            headers.insert(
                HeaderName::from_static(version_header),
                HeaderValue::from_static(version),
            );
        }
        AuthStyle::QueryParam { name } => {
            url.query_pairs_mut().append_pair(name, credentials.api_key());
        }
    }

    Ok(PreparedRequest {
        url,
        headers,
        body: Bytes::from(body),
        streaming,
    })
}

/// Base URL plus the endpoint template, with the model pushed as an encoded
/// path segment so `/`, `?` and `#` in a model name stay inside the path.
fn endpoint_url(
    config: &ProviderConfig,
    credentials: &ProviderCredentials,
    model: &str,
    streaming: bool,
) -> Result<Url> {
    let invalid = |reason: String| Error::Config(format!("Invalid URL for {}: {}", config.id, reason));

    let mut url = Url::parse(credentials.base_url(config)).map_err(|e| invalid(e.to_string()))?;
    let (path, query) = match config.endpoint_template(streaming).split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (config.endpoint_template(streaming), None),
    };

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| invalid("base URL cannot carry a path".to_string()))?;
        segments.pop_if_empty();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            segments.push(&segment.replace("{model}", model));
        }
    }
    url.set_query(query);

    Ok(url)
}

fn secret_header(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| Error::Config("API key contains characters not allowed in a header".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

// OpenAI-compatible chat completions (openai, deepseek, grok)

#[derive(Debug, Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn openai_body(request: &CanonicalChatRequest, streaming: bool) -> OpenAIChatRequest<'_> {
    let messages = request
        .turns
        .iter()
        .map(|turn| OpenAIMessage {
            role: match turn.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant | Role::Model => "assistant",
            },
            content: &turn.text,
        })
        .collect();

    OpenAIChatRequest {
        model: &request.model,
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        stream: streaming,
    }
}

// Gemini generateContent

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

fn gemini_body(request: &CanonicalChatRequest) -> GeminiRequest<'_> {
    // System text is sent as a leading "model" turn; this integration has no
    // systemInstruction slot.
    let system = request.turns.iter().filter(|t| t.role == Role::System);
    let rest = request.turns.iter().filter(|t| t.role != Role::System);

    let contents = system
        .chain(rest)
        .map(|turn: &ChatTurn| GeminiContent {
            role: match turn.role {
                Role::User => "user",
                Role::System | Role::Assistant | Role::Model => "model",
            },
            parts: vec![GeminiPart { text: &turn.text }],
        })
        .collect();

    GeminiRequest {
        contents,
        generation_config: GeminiGenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

// Anthropic messages

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

fn anthropic_body(request: &CanonicalChatRequest) -> AnthropicRequest<'_> {
    // No separate system slot here: system text is folded into the first user turn.
    let system = request
        .texts(Role::System)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let mut system = Some(system).filter(|s| !s.is_empty());

    let messages = request
        .turns
        .iter()
        .filter(|t| t.role != Role::System)
        .map(|turn| match turn.role {
            Role::User => AnthropicMessage {
                role: "user",
                content: match system.take() {
                    Some(system) => format!("{}\n\n{}", system, turn.text),
                    None => turn.text.clone(),
                },
            },
            _ => AnthropicMessage {
                role: "assistant",
                content: turn.text.clone(),
            },
        })
        .collect();

    AnthropicRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        messages,
    }
}
