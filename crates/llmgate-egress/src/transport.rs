//! HTTP transport with bounded exponential-backoff retry

use crate::client::{HttpClientConfig, create_client, with_retry};
use crate::payload::PreparedRequest;
use crate::EgressError;
use bytes::Bytes;
use llmgate_core::RetryPolicy;
use rand::SeedableRng;
use rand::rngs::StdRng;
use reqwest::Client;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// How much of a successful response the transport should read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Read the whole body inside the retry loop
    Buffered,
    /// Hand back the open response for incremental reading
    Streaming,
}

/// Successful upstream response
#[derive(Debug)]
pub struct RawResponse {
    /// Attempts it took, including the successful one
    pub attempts: u32,
    pub body: RawBody,
}

#[derive(Debug)]
pub enum RawBody {
    Buffered(Bytes),
    Streaming(reqwest::Response),
}

/// Pooled transport shared by all concurrent calls
///
/// The jitter source is a single generator owned by the transport; calls
/// borrow it only while computing a delay.
pub struct HttpTransport {
    client: Client,
    policy: RetryPolicy,
    rng: Mutex<StdRng>,
}

impl HttpTransport {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Build the pooled client from `config`
    pub fn from_config(config: &HttpClientConfig, policy: RetryPolicy) -> crate::Result<Self> {
        Ok(Self::new(create_client(config)?, policy))
    }

    /// Use a deterministic jitter sequence
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// POST `prepared`, retrying network failures, 408, 429 and 5xx.
    ///
    /// Any other non-success status fails immediately. Once retries are
    /// exhausted the last status and a truncated body are reported as
    /// `ProviderCallFailed`.
    #[instrument(skip(self, prepared, cancel), fields(url = %prepared.redacted_url()))]
    pub async fn send(
        &self,
        prepared: &PreparedRequest,
        mode: ResponseMode,
        cancel: &CancellationToken,
    ) -> llmgate_core::Result<RawResponse> {
        let (body, attempts) = with_retry(&self.policy, &self.rng, cancel, |attempt| {
            // Headers are attached per request; the shared client has no auth defaults.
            let request = self
                .client
                .post(prepared.url.clone())
                .headers(prepared.headers.clone())
                .body(prepared.body.clone());

            async move {
                debug!(attempt, "Sending upstream request");
                let response = request.send().await?;
                let status = response.status();
                debug!(attempt, status = status.as_u16(), "Upstream responded");

                if !status.is_success() {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unable to read error body".to_string());
                    return Err(EgressError::ProviderError {
                        status_code: status.as_u16(),
                        message: body,
                    });
                }

                match mode {
                    ResponseMode::Buffered => Ok(RawBody::Buffered(response.bytes().await?)),
                    ResponseMode::Streaming => Ok(RawBody::Streaming(response)),
                }
            }
        })
        .await?;

        Ok(RawResponse { attempts, body })
    }
}
