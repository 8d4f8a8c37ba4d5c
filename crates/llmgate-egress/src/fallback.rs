//! Empty-output fallback for the "solve" use case
//!
//! DeepSeek's reasoning model occasionally finishes successfully with no
//! visible answer. For that one provider/model pair a single follow-up call
//! is made with a secondary model, a simpler prompt and a smaller token
//! budget. Hard failures of the primary call are returned as-is.

use llmgate_core::{CanonicalChatRequest, CanonicalChatResponse, Gateway, ProviderId, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Primary model known to return empty output on success
pub const DEEPSEEK_REASONING_MODEL: &str = "deepseek-reasoner";

pub const DEFAULT_SOLVE_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_FALLBACK_MAX_TOKENS: u32 = 2000;

/// Caller-supplied system/user text pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvePrompt {
    pub system: String,
    pub user: String,
}

impl SolvePrompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub provider: ProviderId,
    pub primary_model: String,
    pub fallback_model: String,
    pub prompt: SolvePrompt,
    /// Simplified pair for the fallback call; the primary prompt is reused when absent
    pub fallback_prompt: Option<SolvePrompt>,
    pub max_tokens: u32,
    pub fallback_max_tokens: u32,
    pub temperature: f32,
    pub want_streaming: bool,
}

impl SolveRequest {
    pub fn new(
        provider: ProviderId,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
        prompt: SolvePrompt,
    ) -> Self {
        Self {
            provider,
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
            prompt,
            fallback_prompt: None,
            max_tokens: DEFAULT_SOLVE_MAX_TOKENS,
            fallback_max_tokens: DEFAULT_FALLBACK_MAX_TOKENS,
            temperature: llmgate_core::chat::DEFAULT_TEMPERATURE,
            want_streaming: true,
        }
    }

    pub fn with_fallback_prompt(mut self, prompt: SolvePrompt) -> Self {
        self.fallback_prompt = Some(prompt);
        self
    }

    fn primary_request(&self) -> CanonicalChatRequest {
        chat_request(self, &self.primary_model, &self.prompt, self.max_tokens)
    }

    fn fallback_request(&self) -> CanonicalChatRequest {
        let prompt = match &self.fallback_prompt {
            Some(prompt) => prompt,
            None => {
                debug!(model = %self.fallback_model, "No simplified prompt given, reusing the primary prompt");
                &self.prompt
            }
        };
        chat_request(self, &self.fallback_model, prompt, self.fallback_max_tokens)
    }
}

fn chat_request(
    solve: &SolveRequest,
    model: &str,
    prompt: &SolvePrompt,
    max_tokens: u32,
) -> CanonicalChatRequest {
    let mut request = CanonicalChatRequest::new(solve.provider, model);
    if !prompt.system.is_empty() {
        request = request.with_system(prompt.system.clone());
    }
    request
        .with_user(prompt.user.clone())
        .with_max_tokens(max_tokens)
        .with_temperature(solve.temperature)
        .streaming(solve.want_streaming)
}

/// Only DeepSeek's reasoning model gets the empty-output fallback.
pub fn needs_empty_output_fallback(provider: ProviderId, model: &str) -> bool {
    provider == ProviderId::DeepSeek && model.eq_ignore_ascii_case(DEEPSEEK_REASONING_MODEL)
}

/// Progress of one solve call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePhase {
    Idle,
    PrimaryInFlight,
    FallbackInFlight,
    Done,
    Failed,
}

fn advance(phase: &mut SolvePhase, next: SolvePhase) {
    debug!(from = ?*phase, to = ?next, "Solve phase");
    *phase = next;
}

/// Run the primary model, substituting the fallback model when the primary
/// succeeds with empty text on the one provider/model pair known to do so.
pub async fn solve_with_fallback(
    gateway: &dyn Gateway,
    request: SolveRequest,
    cancel: CancellationToken,
) -> Result<CanonicalChatResponse> {
    let mut phase = SolvePhase::Idle;

    advance(&mut phase, SolvePhase::PrimaryInFlight);
    let primary = match gateway.generate(request.primary_request(), cancel.clone()).await {
        Ok(response) => response,
        Err(e) => {
            if !e.is_cancelled() {
                warn!(provider = %request.provider, model = %request.primary_model, error = %e, "Primary solve call failed");
            }
            advance(&mut phase, SolvePhase::Failed);
            return Err(e);
        }
    };

    if !primary.is_empty() || !needs_empty_output_fallback(request.provider, &request.primary_model) {
        advance(&mut phase, SolvePhase::Done);
        return Ok(primary);
    }

    info!(
        provider = %request.provider,
        primary_model = %request.primary_model,
        fallback_model = %request.fallback_model,
        "Primary model returned empty output, retrying with fallback model"
    );
    advance(&mut phase, SolvePhase::FallbackInFlight);

    let mut fallback = match gateway.generate(request.fallback_request(), cancel).await {
        Ok(response) => response,
        Err(e) => {
            advance(&mut phase, SolvePhase::Failed);
            return Err(e);
        }
    };
    fallback.was_fallback_used = true;

    if fallback.is_empty() {
        warn!(model = %request.fallback_model, "Fallback model also returned empty output");
    }
    advance(&mut phase, SolvePhase::Done);
    Ok(fallback)
}
