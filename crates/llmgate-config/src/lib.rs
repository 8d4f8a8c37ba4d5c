//! Gateway configuration
//!
//! Settings come from an optional YAML or TOML file, then environment
//! variables are layered on top (env wins). The result is turned once, at
//! startup, into the read-only credential table and HTTP/retry tuning the
//! gateway runs with.
//!
//! ```yaml
//! providers:
//!   deepseek:
//!     api_key: sk-...
//!   gemini:
//!     base_url: http://localhost:8080/v1beta
//! retry:
//!   max_attempts: 3
//! logging:
//!   level: debug
//! ```

use llmgate_core::{Error, ProviderCredentials, ProviderId, Result, RetryPolicy};
use llmgate_egress::HttpClientConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    pub openai: Option<ProviderSettings>,
    pub deepseek: Option<ProviderSettings>,
    pub gemini: Option<ProviderSettings>,
    pub grok: Option<ProviderSettings>,
    pub anthropic: Option<ProviderSettings>,
}

#[derive(Clone, Deserialize)]
pub struct ProviderSettings {
    pub api_key: Option<String>,

    pub base_url: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// Bound on one upstream request, streaming included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            enabled: true,
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, provider: ProviderId) -> Option<&ProviderSettings> {
        match provider {
            ProviderId::OpenAI => self.openai.as_ref(),
            ProviderId::DeepSeek => self.deepseek.as_ref(),
            ProviderId::Gemini => self.gemini.as_ref(),
            ProviderId::Grok => self.grok.as_ref(),
            ProviderId::Anthropic => self.anthropic.as_ref(),
        }
    }

    fn entry(&mut self, provider: ProviderId) -> &mut ProviderSettings {
        let slot = match provider {
            ProviderId::OpenAI => &mut self.openai,
            ProviderId::DeepSeek => &mut self.deepseek,
            ProviderId::Gemini => &mut self.gemini,
            ProviderId::Grok => &mut self.grok,
            ProviderId::Anthropic => &mut self.anthropic,
        };
        slot.get_or_insert_with(ProviderSettings::default)
    }
}

/// Environment variables holding each provider's key, first match wins
fn api_key_vars(provider: ProviderId) -> &'static [&'static str] {
    match provider {
        ProviderId::OpenAI => &["OPENAI_API_KEY"],
        ProviderId::DeepSeek => &["DEEPSEEK_API_KEY"],
        ProviderId::Gemini => &["GEMINI_API_KEY"],
        ProviderId::Grok => &["XAI_API_KEY", "GROK_API_KEY"],
        ProviderId::Anthropic => &["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"],
    }
}

fn base_url_var(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenAI => "OPENAI_BASE_URL",
        ProviderId::DeepSeek => "DEEPSEEK_BASE_URL",
        ProviderId::Gemini => "GEMINI_BASE_URL",
        ProviderId::Grok => "XAI_BASE_URL",
        ProviderId::Anthropic => "ANTHROPIC_BASE_URL",
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl GatewayConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid YAML: {}", e)))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        for provider in ProviderId::ALL {
            let api_key = api_key_vars(provider)
                .iter()
                .find_map(|name| non_empty_var(name));
            if let Some(api_key) = api_key {
                self.providers.entry(provider).api_key = Some(api_key);
            }

            if let Some(base_url) = non_empty_var(base_url_var(provider)) {
                self.providers.entry(provider).base_url = Some(base_url);
            }
        }

        if let Some(val) = non_empty_var("LLMGATE_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Some(val) = non_empty_var("LLMGATE_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => self.http.timeout_secs = secs,
                Err(_) => warn!(value = %val, "Ignoring invalid LLMGATE_TIMEOUT_SECS"),
            }
        }

        if let Some(val) = non_empty_var("LLMGATE_MAX_ATTEMPTS") {
            match val.parse::<u32>() {
                Ok(attempts) => self.retry.max_attempts = attempts,
                Err(_) => warn!(value = %val, "Ignoring invalid LLMGATE_MAX_ATTEMPTS"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::Config("http.timeout_secs must be greater than 0".to_string()));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(Error::Config(
                "http.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        for provider in ProviderId::ALL {
            let base_url = self
                .providers
                .get(provider)
                .and_then(|s| s.base_url.as_deref());
            if let Some(url) = base_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(Error::Config(format!(
                        "providers.{}.base_url must be an http(s) URL, got '{}'",
                        provider, url
                    )));
                }
            }
        }

        Ok(())
    }

    /// Credentials for the provider, failing fast when it cannot be called
    pub fn require(&self, provider: ProviderId) -> Result<ProviderCredentials> {
        let not_configured = |reason: &str| Error::ProviderNotConfigured {
            provider,
            reason: reason.to_string(),
        };

        let settings = self
            .providers
            .get(provider)
            .ok_or_else(|| not_configured("no API key configured"))?;
        if !settings.enabled {
            return Err(not_configured("provider is disabled"));
        }

        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| not_configured("no API key configured"))?;

        let credentials = ProviderCredentials::new(api_key);
        Ok(match &settings.base_url {
            Some(url) => credentials.with_base_url(url.clone()),
            None => credentials,
        })
    }

    /// Every enabled provider that has a key
    pub fn credentials(&self) -> HashMap<ProviderId, ProviderCredentials> {
        ProviderId::ALL
            .into_iter()
            .filter_map(|provider| self.require(provider).ok().map(|c| (provider, c)))
            .collect()
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout_secs: self.http.timeout_secs,
            connect_timeout_secs: self.http.connect_timeout_secs,
            pool_max_idle_per_host: self.http.pool_max_idle_per_host,
            ..HttpClientConfig::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_jitter: Duration::from_millis(self.retry.max_jitter_ms),
        }
    }

    /// Overall per-call deadline
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_pool_max_idle_per_host() -> usize {
    32
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
