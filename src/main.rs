//! Risk-adaptive access gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────────┐
//!                              │                    RISK GATEWAY                       │
//!                              │                                                       │
//!     Client Request           │  ┌─────────┐    ┌─────────┐    ┌──────────────┐       │
//!     ─────────────────────────┼─▶│  http   │───▶│ routing │───▶│     auth     │       │
//!                              │  │ server  │    │ classify│    │   (bearer)   │       │
//!                              │  └─────────┘    └─────────┘    └──────┬───────┘       │
//!                              │                                       │               │
//!                              │                                       ▼               │
//!                              │                ┌──────────────┐ ┌──────────────┐      │
//!                              │                │  admission   │◀│     risk     │      │
//!                              │                │ allow/flag/  │ │ geo, device, │      │
//!                              │                │     deny     │ │  path, time  │      │
//!                              │                └──────┬───────┘ └──────────────┘      │
//!                              │                       │                               │
//!                              │                       ▼                               │
//!     Client Response          │  ┌─────────┐    ┌──────────────┐                      │
//!     ◀────────────────────────┼──│response │◀───│    proxy     │◀─────────────────────┼──── Backend
//!                              │  │ headers │    │  dispatcher  │                      │
//!                              │  └─────────┘    └──────────────┘                      │
//!                              │                                                       │
//!                              │  Cross-cutting: config, observability, lifecycle      │
//!                              └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use risk_gateway::config::load_config;
use risk_gateway::observability::init_logging;
use risk_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "risk-gateway")]
#[command(about = "Risk-adaptive access gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "config/gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    init_logging(&config.observability)?;

    tracing::info!(
        config = %args.config.display(),
        bind_address = %config.listener.bind_address,
        backend = %config.backend.base_url,
        flag_at = config.admission.flag_at,
        deny_at = config.admission.deny_at,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = HttpServer::new(config)?;
    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
