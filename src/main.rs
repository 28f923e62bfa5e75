//! openrouter-relay - Minimal chat-completion relay for OpenRouter
//!
//! Forwards `{prompt, model_name}` requests to OpenRouter with a server-held
//! key and relays the reply, buffered or streamed, with CORS headers.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use openrouter_relay::config::{Config, KeySource};
use openrouter_relay::relay::run_server;

#[derive(Parser)]
#[command(name = "openrouter-relay")]
#[command(about = "Minimal chat-completion relay for OpenRouter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Path to configuration file (defaults plus environment when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration and show the effective upstream settings
    Check {
        /// Path to configuration file (defaults plus environment when omitted)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> anyhow::Result<(Config, KeySource)> {
    let loaded = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    Ok(loaded)
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("openrouter_relay={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let (mut loaded, key_source) = load_config(config.as_deref())?;
            init_tracing(&loaded.logging.level);

            tracing::info!(config = ?config, "Loaded configuration");
            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                loaded.server.listen = addr;
            }

            if key_source.is_missing() {
                tracing::warn!(
                    key_source = %key_source,
                    "No upstream API key configured - every relay request will fail with 500"
                );
            } else {
                tracing::info!(key_source = %key_source, "Upstream API key resolved");
            }

            run_server(loaded).await
        }

        Commands::Check { config } => {
            let (loaded, key_source) = load_config(config.as_deref())?;

            println!("Configuration OK");
            println!("  listen:          {}", loaded.server.listen);
            println!("  upstream url:    {}", loaded.upstream.url);
            println!(
                "  api key:         {}",
                loaded
                    .upstream
                    .credential()
                    .map(|key| key.to_string())
                    .unwrap_or_else(|| "(missing)".to_string())
            );
            println!("  key source:      {}", key_source);
            println!("  default referer: {}", loaded.upstream.default_referer);
            println!("  default title:   {}", loaded.upstream.default_title);
            Ok(())
        }
    }
}
