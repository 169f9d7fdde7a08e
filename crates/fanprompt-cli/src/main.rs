use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use fanprompt_core::backends::{
    AnthropicBackend, GeminiBackend, ModelBackend, OllamaBackend, OpenAiBackend,
};
use fanprompt_core::board::DEFAULT_CEO_MODEL;
use fanprompt_core::{
    BoardRequest, FanOutConfig, FanOutOrchestrator, ModelRouter, Provider, ProviderRegistry,
};
use fanprompt_gateway::GatewayServer;

mod config;

use config::{FanpromptConfig, ProvidersConfig};

#[derive(Parser)]
#[command(name = "fanprompt")]
#[command(version)]
#[command(about = "fanprompt - send one prompt to many LLMs")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration (secrets masked)
    Config,

    /// Show which providers have credentials configured
    Providers,

    /// List every supported provider and its short alias
    ListProviders,

    /// List the models a provider currently offers
    ListModels {
        /// Provider name or alias (e.g. openai, o)
        provider: String,
    },

    /// Send a prompt to one or more models
    Prompt {
        /// The prompt text
        text: String,
        #[command(flatten)]
        models: ModelArgs,
    },

    /// Send the contents of a file to one or more models
    PromptFile {
        file: PathBuf,
        #[command(flatten)]
        models: ModelArgs,
    },

    /// Like prompt-file, but write each response to its own file
    PromptFileToFile {
        file: PathBuf,
        #[command(flatten)]
        models: ModelArgs,
        /// Directory for the response files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Ask a board of models, then have a CEO model decide
    CeoBoard {
        file: PathBuf,
        #[command(flatten)]
        models: ModelArgs,
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Model that reads the board's answers and decides
        #[arg(long, default_value = DEFAULT_CEO_MODEL)]
        ceo_model: String,
    },

    /// Serve the HTTP gateway until Ctrl+C
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ModelArgs {
    /// provider:model, repeatable; the configured defaults when omitted
    #[arg(short = 'm', long = "model")]
    models: Vec<String>,

    /// Model used to correct misspelled model names
    #[arg(long)]
    correction_model: Option<String>,
}

impl ModelArgs {
    fn models(&self) -> Option<Vec<String>> {
        if self.models.is_empty() {
            None
        } else {
            Some(self.models.clone())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging on stderr so responses on stdout stay clean
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Providers => cmd_providers(&cli.config).await,
        Commands::ListProviders => cmd_list_providers().await,
        Commands::ListModels { provider } => cmd_list_models(&cli.config, &provider).await,
        Commands::Prompt { text, models } => cmd_prompt(&cli.config, &text, &models).await,
        Commands::PromptFile { file, models } => {
            cmd_prompt_file(&cli.config, &file, &models).await
        }
        Commands::PromptFileToFile {
            file,
            models,
            output_dir,
        } => cmd_prompt_file_to_file(&cli.config, &file, &models, &output_dir).await,
        Commands::CeoBoard {
            file,
            models,
            output_dir,
            ceo_model,
        } => cmd_ceo_board(&cli.config, &file, &models, &output_dir, ceo_model).await,
        Commands::Serve { port } => cmd_serve(&cli.config, port).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("fanprompt initialized at {}", config_dir.display());
    println!("Edit {} to configure your providers.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = FanpromptConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

async fn cmd_providers(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = FanpromptConfig::load(config_path)?;
    for line in availability_report(&cfg.providers) {
        println!("{}", line);
    }
    Ok(())
}

async fn cmd_list_providers() -> Result<()> {
    for info in fanprompt_core::list_providers() {
        println!("{:<10} {:<3} {}", info.full_name, info.short_name, info.name);
    }
    Ok(())
}

async fn cmd_list_models(config_path: &Option<PathBuf>, provider: &str) -> Result<()> {
    let cfg = FanpromptConfig::load(config_path)?;
    let router = ModelRouter::new(build_registry(&cfg.providers));
    for model in router.route_list_models(provider).await? {
        println!("{}", model);
    }
    Ok(())
}

async fn cmd_prompt(config_path: &Option<PathBuf>, text: &str, args: &ModelArgs) -> Result<()> {
    let cfg = FanpromptConfig::load(config_path)?;
    let fan = build_orchestrator(&cfg, args.correction_model.clone());
    let models = fan.models_or_default(args.models());
    let responses = fan.fan_out(text, &models, None).await?;
    print_responses(&models, &responses);
    Ok(())
}

async fn cmd_prompt_file(
    config_path: &Option<PathBuf>,
    file: &Path,
    args: &ModelArgs,
) -> Result<()> {
    let cfg = FanpromptConfig::load(config_path)?;
    let fan = build_orchestrator(&cfg, args.correction_model.clone());
    let models = fan.models_or_default(args.models());
    let responses =
        fanprompt_core::prompt_from_file(&fan, file, Some(models.clone()), None).await?;
    print_responses(&models, &responses);
    Ok(())
}

async fn cmd_prompt_file_to_file(
    config_path: &Option<PathBuf>,
    file: &Path,
    args: &ModelArgs,
    output_dir: &Path,
) -> Result<()> {
    let cfg = FanpromptConfig::load(config_path)?;
    let fan = build_orchestrator(&cfg, args.correction_model.clone());
    let paths =
        fanprompt_core::prompt_from_file_to_file(&fan, file, args.models(), output_dir, None)
            .await?;
    for path in paths {
        println!("{}", path);
    }
    Ok(())
}

async fn cmd_ceo_board(
    config_path: &Option<PathBuf>,
    file: &Path,
    args: &ModelArgs,
    output_dir: &Path,
    ceo_model: String,
) -> Result<()> {
    let cfg = FanpromptConfig::load(config_path)?;
    let fan = build_orchestrator(&cfg, args.correction_model.clone());
    let decision = fanprompt_core::ceo_and_board(
        &fan,
        file,
        output_dir,
        BoardRequest {
            models: args.models(),
            ceo_model: Some(ceo_model),
            ..Default::default()
        },
    )
    .await?;
    println!("CEO decision written to {}", decision.display());
    Ok(())
}

async fn cmd_serve(config_path: &Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let cfg = FanpromptConfig::load(config_path)?;
    let port = port.unwrap_or(cfg.gateway.port);
    let bind: SocketAddr = format!("{}:{}", cfg.gateway.bind, port)
        .parse()
        .with_context(|| format!("Invalid gateway address {}:{}", cfg.gateway.bind, port))?;

    let fan = build_orchestrator(&cfg, None);
    if fan.router().registry().is_empty() {
        warn!("No providers configured; every prompt will fail. Run `fanprompt providers`.");
    }
    if cfg.gateway.auth_token.is_empty() {
        warn!("Gateway auth is disabled (empty auth_token)");
    }

    let cancel = CancellationToken::new();
    let server = GatewayServer::new(bind, fan, cfg.gateway.auth_token.clone());
    let handle = server.spawn(cancel.clone());

    signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    cancel.cancel();

    handle.await??;
    println!("fanprompt gateway stopped.");
    Ok(())
}

fn build_orchestrator(cfg: &FanpromptConfig, correction_model: Option<String>) -> FanOutOrchestrator {
    let router = ModelRouter::new(build_registry(&cfg.providers));
    let config = FanOutConfig {
        correction_model: correction_model.unwrap_or_else(|| cfg.prompt.correction_model.clone()),
        default_models: cfg.prompt.default_models.clone(),
    };
    FanOutOrchestrator::new(router, config)
}

/// Register a backend for every provider whose credentials are present
fn build_registry(providers: &ProvidersConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for provider in Provider::ALL {
        if !providers.is_available(provider) {
            debug!("Skipping {}: no API key configured", provider);
            continue;
        }
        let backend: Arc<dyn ModelBackend> = match provider {
            Provider::OpenAi => Arc::new(OpenAiBackend::openai(
                providers.openai.api_key.clone(),
                non_empty(&providers.openai.base_url),
            )),
            Provider::Anthropic => Arc::new(
                AnthropicBackend::new(
                    providers.anthropic.api_key.clone(),
                    non_empty(&providers.anthropic.base_url),
                )
                .with_max_tokens(providers.anthropic.max_tokens),
            ),
            Provider::Gemini => Arc::new(GeminiBackend::new(
                providers.gemini.api_key.clone(),
                non_empty(&providers.gemini.base_url),
            )),
            Provider::Groq => Arc::new(OpenAiBackend::groq(
                providers.groq.api_key.clone(),
                non_empty(&providers.groq.base_url),
            )),
            Provider::DeepSeek => Arc::new(OpenAiBackend::deepseek(
                providers.deepseek.api_key.clone(),
                non_empty(&providers.deepseek.base_url),
            )),
            Provider::Ollama => Arc::new(OllamaBackend::new(non_empty(&providers.ollama.base_url))),
        };
        registry = registry.with_backend(provider, backend);
    }
    info!("Registered {} provider(s)", registry.len());
    registry
}

// An unset ${VAR} expands to "", which means "use the default"
fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

fn availability_report(providers: &ProvidersConfig) -> Vec<String> {
    Provider::ALL
        .into_iter()
        .map(|p| {
            let status = if providers.is_available(p) {
                "available".to_string()
            } else {
                format!(
                    "missing api_key (set {})",
                    p.api_key_env().unwrap_or_default()
                )
            };
            format!("{:<10} ({}) {}", p.full_name(), p.short_name(), status)
        })
        .collect()
}

fn print_responses(models: &[String], responses: &[String]) {
    for (model, response) in models.iter().zip(responses) {
        println!("── {} ──", model);
        println!("{}\n", response);
    }
}
