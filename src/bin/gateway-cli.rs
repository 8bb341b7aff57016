use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use risk_gateway::admission::AdmissionController;
use risk_gateway::config::GatewayConfig;
use risk_gateway::http::request::request_timestamp;
use risk_gateway::risk::{RequestContext, RiskEngine};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the risk gateway", long_about = None)]
struct Cli {
    /// Base URL of a running gateway.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Check,
    /// Print the raw metrics exposition
    Metrics,
    /// Score a synthetic request locally, without a running gateway
    Score {
        /// Gateway config file supplying weights, thresholds and geo data.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Client origin address.
        #[arg(long)]
        origin: String,

        /// Client descriptor (User-Agent). Omit to score a missing descriptor.
        #[arg(long)]
        user_agent: Option<String>,

        #[arg(long, default_value = "GET")]
        method: String,

        /// Request path as seen by the gateway (e.g. /api/secure/tasks).
        #[arg(long)]
        path: String,

        /// RFC 3339 timestamp. Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Check => {
            let res = client.get(format!("{}/check", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", cli.url)).send().await?;
            let status = res.status();
            let text = res.text().await?;
            if !status.is_success() {
                eprintln!("Error: gateway returned status {}", status);
            }
            println!("{}", text);
        }
        Commands::Score {
            config,
            origin,
            user_agent,
            method,
            path,
            at,
        } => {
            let config = match config {
                Some(path) => toml::from_str::<GatewayConfig>(&std::fs::read_to_string(path)?)?,
                None => GatewayConfig::default(),
            };
            let timestamp: DateTime<FixedOffset> = match at {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)?,
                None => request_timestamp(config.risk.utc_offset_minutes),
            };

            let engine = RiskEngine::from_config(&config.risk)?;
            let admission = AdmissionController::new(config.admission);
            let ctx = RequestContext::new(&origin, user_agent, method.parse()?, path, timestamp);
            let assessment = engine.score(&ctx);
            let decision = admission.decide(&assessment, None);

            let report = json!({
                "context": {
                    "origin": ctx.origin(),
                    "descriptor": ctx.descriptor(),
                    "method": ctx.method().as_str(),
                    "path": ctx.path(),
                    "timestamp": ctx.timestamp().to_rfc3339(),
                },
                "assessment": assessment,
                "decision": decision,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
