//! LLMGate CLI
//!
//! Operator tool for issuing one-off generations through the gateway

use anyhow::Context;
use clap::{Parser, Subcommand};
use llmgate_config::GatewayConfig;
use llmgate_core::{
    CanonicalChatRequest, Gateway, ProviderConfig, ProviderId, chat::DEFAULT_MAX_TOKENS,
    chat::DEFAULT_TEMPERATURE,
};
use llmgate_egress::fallback::DEFAULT_FALLBACK_MAX_TOKENS;
use llmgate_egress::{HttpGateway, HttpTransport, SolvePrompt, SolveRequest, solve_with_fallback};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG_PATH: &str = "~/.llmgate/config.yaml";

#[derive(Parser)]
#[command(name = "llmgate")]
#[command(about = "LLMGate - one interface to many LLM providers", long_about = None)]
struct Cli {
    /// Path to a YAML or TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one prompt and print the answer
    Generate {
        /// Provider name (openai, deepseek, gemini, grok/xai, anthropic/claude)
        #[arg(long)]
        provider: String,

        #[arg(long)]
        model: String,

        #[arg(long)]
        system: Option<String>,

        #[arg(long)]
        prompt: String,

        /// Stream the response when the provider supports it
        #[arg(long, default_value = "false")]
        stream: bool,

        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: u32,

        #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
        temperature: f32,
    },
    /// Solve a problem, retrying with a fallback model on empty output
    Solve {
        #[arg(long)]
        provider: String,

        #[arg(long)]
        model: String,

        #[arg(long)]
        fallback_model: String,

        #[arg(long)]
        system: Option<String>,

        #[arg(long)]
        prompt: String,

        /// Simplified system text for the fallback call
        #[arg(long)]
        fallback_system: Option<String>,

        /// Simplified user text for the fallback call
        #[arg(long)]
        fallback_prompt: Option<String>,

        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: u32,

        #[arg(long, default_value_t = DEFAULT_FALLBACK_MAX_TOKENS)]
        fallback_max_tokens: u32,
    },
    /// List supported providers and whether each is configured
    Providers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging.level)?;

    match cli.command {
        Commands::Providers => {
            print_providers(&config);
            Ok(())
        }
        Commands::Generate {
            provider,
            model,
            system,
            prompt,
            stream,
            max_tokens,
            temperature,
        } => {
            let provider = ProviderId::parse(&provider)?;
            config.require(provider)?;
            let gateway = build_gateway(&config)?;

            let mut request = CanonicalChatRequest::new(provider, model);
            if let Some(system) = system {
                request = request.with_system(system);
            }
            let request = request
                .with_user(prompt)
                .with_max_tokens(max_tokens)
                .with_temperature(temperature)
                .streaming(stream);

            let response = gateway.generate(request, cancel_on_ctrl_c()).await?;
            println!("{}", response.text);
            Ok(())
        }
        Commands::Solve {
            provider,
            model,
            fallback_model,
            system,
            prompt,
            fallback_system,
            fallback_prompt,
            max_tokens,
            fallback_max_tokens,
        } => {
            let provider = ProviderId::parse(&provider)?;
            config.require(provider)?;
            let gateway = build_gateway(&config)?;

            let system = system.unwrap_or_default();
            let mut request = SolveRequest::new(
                provider,
                model,
                fallback_model,
                SolvePrompt::new(system.clone(), prompt.clone()),
            );
            if fallback_system.is_some() || fallback_prompt.is_some() {
                request = request.with_fallback_prompt(SolvePrompt::new(
                    fallback_system.unwrap_or(system),
                    fallback_prompt.unwrap_or(prompt),
                ));
            }
            request.max_tokens = max_tokens;
            request.fallback_max_tokens = fallback_max_tokens;

            let response = solve_with_fallback(&gateway, request, cancel_on_ctrl_c()).await?;
            if response.was_fallback_used {
                info!(model = %response.model, "Answer produced by fallback model");
            }
            println!("{}", response.text);
            Ok(())
        }
    }
}

/// Explicit path, else the default location if present, else built-in defaults;
/// environment variables are applied last.
fn load_config(path: Option<&Path>) -> anyhow::Result<GatewayConfig> {
    let mut config = match path {
        Some(path) => {
            let path = expand_path(path);
            GatewayConfig::from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            let default_path = PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).to_string());
            if default_path.exists() {
                GatewayConfig::from_file(&default_path)?
            } else {
                GatewayConfig::default()
            }
        }
    };

    config.merge_env();
    config.validate()?;
    Ok(config)
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// RUST_LOG wins over the configured level. Logs go to stderr so stdout
/// carries only the generated text.
fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_gateway(config: &GatewayConfig) -> anyhow::Result<HttpGateway> {
    let transport = HttpTransport::from_config(&config.http_client_config(), config.retry_policy())
        .context("Failed to create HTTP client")?;
    Ok(HttpGateway::new(transport, config.credentials()).with_call_timeout(config.call_timeout()))
}

/// Token cancelled on the first Ctrl+C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl+C received, cancelling");
            trigger.cancel();
        }
    });
    cancel
}

fn print_providers(config: &GatewayConfig) {
    println!("{:<10} {:<10} {:<11} BASE URL", "PROVIDER", "STREAMING", "CONFIGURED");
    for provider in ProviderConfig::all() {
        let configured = config.require(provider.id).is_ok();
        let base_url = config
            .providers
            .get(provider.id)
            .and_then(|s| s.base_url.as_deref())
            .unwrap_or(provider.base_url);
        println!(
            "{:<10} {:<10} {:<11} {}",
            provider.id.as_str(),
            if provider.supports_native_streaming { "yes" } else { "no" },
            if configured { "yes" } else { "no" },
            base_url
        );
    }
}
