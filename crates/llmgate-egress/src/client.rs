//! Shared HTTP client utilities

use crate::{EgressError, Result};
use llmgate_core::{CancelReason, RetryPolicy};
use rand::rngs::StdRng;
use reqwest::{Client, ClientBuilder};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    /// Note: This applies to the entire request including streaming responses,
    /// so it must cover slow generations.
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            // Long generations (reasoning models, large exams) can stream for
            // several minutes.
            timeout_secs: 600,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 32,
            user_agent: format!("LLMGate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a configured HTTP client with connection pooling
///
/// The client carries no auth headers; every request attaches its own.
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Expire idle connections before upstream servers close them
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| EgressError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Run `operation` under `policy`, sleeping between transient failures.
///
/// `operation` receives the 1-based attempt number. On success the value is
/// returned together with the number of attempts it took. Cancellation is
/// checked while an attempt is in flight and while backing off; a cancelled
/// call never starts another attempt.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    rng: &Mutex<StdRng>,
    cancel: &CancellationToken,
    mut operation: F,
) -> llmgate_core::Result<(T, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EgressError::Cancelled(CancelReason::Caller)),
            result = operation(attempt) => result,
        };

        let err = match outcome {
            Ok(value) => return Ok((value, attempt)),
            Err(EgressError::Cancelled(reason)) => {
                debug!(attempt, "Upstream call cancelled");
                return Err(llmgate_core::Error::cancelled(reason));
            }
            Err(e) => e,
        };

        let failure = err.failure_class();
        let decision = {
            let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
            policy.decide(attempt, failure, &mut *rng)
        };

        if !decision.should_retry {
            if failure.is_transient() {
                warn!(attempt, error = %err, "Giving up after {} attempts", attempt);
            } else {
                debug!(attempt, error = %err, "Non-retryable upstream failure");
            }
            return Err(err.into_core(attempt));
        }

        warn!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = decision.delay.as_millis() as u64,
            error = %err,
            "Upstream attempt failed, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(attempt, "Cancelled during backoff");
                return Err(llmgate_core::Error::cancelled(CancelReason::Caller));
            }
            _ = tokio::time::sleep(decision.delay) => {}
        }
    }
}
