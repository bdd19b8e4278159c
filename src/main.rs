//! LLM chat relay
//!
//! A small CORS-aware proxy in front of a chat-completions API.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                    RELAY                      │
//!     Browser request     │  ┌──────────┐   ┌────────────┐   ┌─────────┐  │
//!     ────────────────────┼─▶│ ingress  │──▶│ normalizer │──▶│upstream │──┼──▶ Chat API
//!                         │  │ (CORS)   │   │            │   │ caller  │  │
//!                         │  └──────────┘   └────────────┘   └────┬────┘  │
//!                         │                                       │       │
//!     Client response     │                 ┌────────────┐        │       │
//!     ◀───────────────────┼─────────────────│ classifier │◀───────┘       │
//!                         │                 └────────────┘                │
//!                         │  config · resilience · observability · lifecycle
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use llm_relay::config::{self, loader::with_port};
use llm_relay::http::HttpServer;
use llm_relay::lifecycle::Shutdown;
use llm_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "llm-relay")]
#[command(about = "CORS-aware relay in front of a chat-completions API", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listener port, overriding the config file and `PORT`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref(), |name| std::env::var(name).ok())?;
    if let Some(port) = cli.port {
        config.listener.bind_address = with_port(&config.listener.bind_address, port);
    }

    logging::init_logging(&config.observability);

    tracing::info!("llm-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        endpoint = %config.upstream.endpoint,
        retry_budget = config.retries.retry_budget,
        attempt_timeout_ms = config.timeouts.attempt_ms,
        cors_mode = ?config.cors.mode,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signal_shutdown.trigger_on_signal().await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
