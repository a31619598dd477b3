//! Errand task pipeline daemon.
//!
//! Binary name: `errandd`
//!
//! Parses CLI arguments, loads the TOML config, wires the SQLite store and
//! live API clients into the pipeline stages, then runs the task processor
//! and task monitor loops until shutdown.

mod config;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use errand_core::event::bus::EventBus;
use errand_core::external::handler::DefaultServiceHandler;
use errand_core::notify::registry::NotifierRegistry;
use errand_core::pipeline::monitor::TaskMonitor;
use errand_core::pipeline::processor::TaskProcessor;
use errand_infra::factory::LiveNotifierFactory;
use errand_infra::http::dispatch::ReqwestDispatcher;
use errand_infra::image::openai::OpenAiImageGenerator;
use errand_infra::sqlite::pool::{DatabasePool, default_database_url};
use errand_infra::sqlite::task::SqliteTaskRepository;
use errand_types::agent::AgentProfile;

use config::DaemonConfig;

#[derive(Parser)]
#[command(name = "errandd", about = "Task pipeline daemon for Errand agents")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the task processor and task monitor loops
    Run {
        /// Path to the TOML config file
        #[arg(short, long, default_value = "errand.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,errand=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { config } => run(&config).await,
    }
}

async fn run(config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = DaemonConfig::load(config_path)?;

    let database_url = config
        .database_url
        .clone()
        .unwrap_or_else(default_database_url);
    let pool = DatabasePool::new(&database_url).await?;
    let repo = Arc::new(SqliteTaskRepository::new(pool));
    tracing::info!(database_url, "task store ready");

    let bus = EventBus::new(256);

    let mut handler = DefaultServiceHandler::new(
        OpenAiImageGenerator::new(),
        ReqwestDispatcher::new(),
    )
    .with_default_api_key(config.openai_api_key.clone());
    if let Some(endpoint) = &config.mcp_endpoint {
        handler = handler.with_mcp_endpoint(endpoint.clone());
    }

    let processor = TaskProcessor::new(
        Arc::clone(&repo),
        Arc::new(handler),
        bus.clone(),
        config.pipeline.clone(),
    );

    let agents: HashMap<Uuid, AgentProfile> = config
        .agents
        .iter()
        .map(|agent| (agent.id, agent.clone()))
        .collect();
    tracing::info!(agents = agents.len(), "agent profiles loaded");

    let registry = Arc::new(NotifierRegistry::new(LiveNotifierFactory::new()));
    let monitor = TaskMonitor::new(
        Arc::clone(&repo),
        registry,
        agents,
        bus.clone(),
        config.pipeline.clone(),
    );

    let cancel = CancellationToken::new();

    let processor_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { processor.run(cancel).await }
    });
    let monitor_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { monitor.run(cancel).await }
    });

    shutdown_signal().await;
    tracing::info!("shutdown requested, stopping loops");
    cancel.cancel();

    processor_handle.await?;
    monitor_handle.await?;
    tracing::info!("daemon stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
