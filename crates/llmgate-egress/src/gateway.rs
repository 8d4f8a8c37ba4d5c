//! The end-to-end generation pipeline
//!
//! build payload → send with retry → aggregate stream or extract envelope

use crate::envelope;
use crate::payload;
use crate::streaming;
use crate::transport::{HttpTransport, RawBody, ResponseMode};
use async_trait::async_trait;
use llmgate_core::{
    CancelReason, CanonicalChatRequest, CanonicalChatResponse, Error, Gateway, ProviderCredentials,
    ProviderId, Result,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default bound on one whole call, retries and streaming included
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Gateway backed by real HTTP providers
///
/// Holds only read-only state (credentials, catalog references) plus the
/// pooled transport, so one instance serves any number of concurrent calls.
pub struct HttpGateway {
    transport: HttpTransport,
    credentials: HashMap<ProviderId, ProviderCredentials>,
    call_timeout: Duration,
}

impl HttpGateway {
    pub fn new(
        transport: HttpTransport,
        credentials: HashMap<ProviderId, ProviderCredentials>,
    ) -> Self {
        info!(
            providers = ?credentials.keys().map(|p| p.as_str()).collect::<Vec<_>>(),
            "Gateway initialized"
        );
        Self {
            transport,
            credentials,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the overall per-call deadline
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn is_configured(&self, provider: ProviderId) -> bool {
        self.credentials.contains_key(&provider)
    }

    fn credentials(&self, provider: ProviderId) -> Result<&ProviderCredentials> {
        self.credentials
            .get(&provider)
            .ok_or_else(|| Error::ProviderNotConfigured {
                provider,
                reason: "no API key configured".to_string(),
            })
    }

    async fn run(
        &self,
        request: CanonicalChatRequest,
        cancel: &CancellationToken,
    ) -> Result<CanonicalChatResponse> {
        request.validate()?;
        let config = request.provider.config();
        let credentials = self.credentials(request.provider)?;

        let prepared = payload::build(&request, config, credentials)?;
        if request.want_streaming && !prepared.streaming {
            debug!("Provider has no native streaming, using a buffered call");
        }
        debug!(request = ?prepared, "Prepared upstream request");

        let mode = if prepared.streaming {
            ResponseMode::Streaming
        } else {
            ResponseMode::Buffered
        };
        let raw = self.transport.send(&prepared, mode, cancel).await?;

        let text = match raw.body {
            RawBody::Streaming(response) => {
                let outcome = streaming::aggregate(response.bytes_stream(), config, cancel).await?;
                if outcome.missing_terminator(config) {
                    warn!(
                        data_frames = outcome.data_frames,
                        "Stream ended without a terminator"
                    );
                }
                outcome.text
            }
            RawBody::Buffered(body) => envelope::extract(&body, config.final_text_path)?,
        };

        debug!(attempts = raw.attempts, chars = text.len(), "Generation finished");
        Ok(CanonicalChatResponse::new(request.provider, request.model, text))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    #[instrument(
        skip(self, request, cancel),
        fields(provider = %request.provider, model = %request.model, streaming = request.want_streaming)
    )]
    async fn generate(
        &self,
        request: CanonicalChatRequest,
        cancel: CancellationToken,
    ) -> Result<CanonicalChatResponse> {
        match tokio::time::timeout(self.call_timeout, self.run(request, &cancel)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(timeout_secs = self.call_timeout.as_secs(), "Call deadline elapsed");
                Err(Error::cancelled(CancelReason::Deadline))
            }
        }
    }
}
