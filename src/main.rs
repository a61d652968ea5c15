use std::path::PathBuf;

use anyhow::Context;
use bridge_listener::{BridgeConfig, BridgeOrchestrator, Outcome};
use clap::Parser;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(rename_all = "kebab-case", author, version, about)]
struct Args {
    /// YAML or JSON config file. Configuration is read from the environment (and `.env`) when
    /// omitted.
    #[clap(env = "BRIDGE_CONFIG", long)]
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let args = Args::parse();
    let config = match &args.config_path {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => BridgeConfig::from_env().context("failed to load config from environment")?,
    };

    let mut orchestrator =
        BridgeOrchestrator::connect(&config).await.context("failed to start bridge listener")?;
    let mut outcomes = orchestrator.subscribe();

    let printer = tokio::spawn(async move {
        while let Some(record) = outcomes.next().await {
            match &record.outcome {
                Outcome::Simulated { action, .. } => {
                    println!("\n{}\n{action}\n{}\n", "-".repeat(80), "-".repeat(80));
                }
                _ => println!("{record}"),
            }
        }
    });

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, finishing current tick");
                signal.cancel();
            }
            Err(err) => error!(error = %err, "Failed to listen for shutdown signal"),
        }
    });

    orchestrator.run(shutdown).await;
    printer.await?;
    Ok(())
}
