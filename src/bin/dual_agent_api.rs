//! HTTP API that routes instructions to the Base or Optimism agent

use clap::Parser;
use skywire_agent::config::AgentSpec;
use skywire_agent::router::AgentRouter;
use skywire_agent::server::{self, AppState};
use skywire_agent::wallet::WalletStore;
use skywire_agent::{Config, Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dual-agent-api")]
#[command(about = "Route instructions to Base or Optimism blockchain agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.router.bind_addr = bind;
    }
    for spec in &mut config.router.agents {
        resolve_sibling(spec);
    }

    let agents = Arc::new(AgentRouter::new(config.router.agents.clone()));
    if let Err(e) = agents.validate() {
        tracing::error!(error = %e, "Agent configuration is invalid");
        std::process::exit(1);
    }

    // Settle the shared wallet file before either child can race to create it
    let (wallet, source) =
        WalletStore::new(&config.wallet_data_path).load_or_create(&config.network_id)?;
    tracing::info!(address = %wallet.address(), source = ?source, "Agents will share wallet");

    let state = Arc::new(AppState::new(agents.clone(), config.router.clone()));
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.router.bind_addr).await?;
    tracing::info!(addr = %config.router.bind_addr, "Dual Chain Agent API listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down...");
            }
        })
        .await;

    agents.shutdown().await;
    served.map_err(Error::Io)
}

/// Prefer an agent binary installed next to this one over a PATH lookup
fn resolve_sibling(spec: &mut AgentSpec) {
    if spec.command.contains('/') || spec.command.contains(std::path::MAIN_SEPARATOR) {
        return;
    }
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&spec.command)))
        .filter(|path| path.is_file());
    if let Some(path) = sibling {
        spec.command = path.to_string_lossy().into_owned();
    }
}
