//! Skywire agent CLI
//!
//! Runs the sETH agent interactively, autonomously, or as a framed child of
//! the dual-agent router.

use clap::{Parser, Subcommand};
use skywire_agent::actions::{ActionRegistry, SkywireActionProvider, WalletActionProvider};
use skywire_agent::agent::{self, Agent};
use skywire_agent::interceptors::{AuditLogInterceptor, PolicyConfig, PolicyInterceptor};
use skywire_agent::llm::OpenAiChat;
use skywire_agent::wallet::{EvmWalletProvider, WalletProvider, WalletStore};
use skywire_agent::{Config, Result, RpcConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "skywire-agent")]
#[command(about = "LLM agent for SuperETH on Base and Optimism")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network to start on (base-sepolia, optimism-sepolia, ...)
    #[arg(short, long, global = true)]
    network: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Chat with the agent on stdin
    Chat,

    /// Act on rotating prompts at a fixed interval
    Auto {
        /// Seconds between steps (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Answer framed instructions on stdin (used by dual-agent-api)
    Serve,

    /// Print the agent wallet details
    Wallet,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Stdout belongs to the agent output (and to the frame protocol in serve mode)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(network) = cli.network {
        config.network_id = network;
    }

    let command = match cli.command {
        Some(command) => command,
        None => choose_mode().await?,
    };

    match command {
        Commands::Wallet => show_wallet(&config).await,
        Commands::Chat => {
            let mut agent = build_agent(&config).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            agent::chat_loop(&mut agent, stdin, &mut tokio::io::stdout()).await
        }
        Commands::Auto { interval } => {
            let mut agent = build_agent(&config).await?;
            let secs = interval.unwrap_or(config.auto.interval_secs).max(1);
            agent::auto_loop(&mut agent, Duration::from_secs(secs), &mut tokio::io::stdout()).await
        }
        Commands::Serve => {
            let mut agent = build_agent(&config).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            agent::serve_loop(&mut agent, stdin, &mut tokio::io::stdout()).await
        }
    }
}

/// Ask for chat or auto when no subcommand was given
async fn choose_mode() -> Result<Commands> {
    let mut out = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        out.write_all(
            b"\nAvailable modes:\n\
              1. chat    - Interactive chat mode\n\
              2. auto    - Autonomous action mode\n\n\
              Choose a mode (enter number or name): ",
        )
        .await?;
        out.flush().await?;

        let Some(choice) = lines.next_line().await? else {
            return Err(skywire_agent::Error::Config("No mode selected".to_string()));
        };
        match choice.trim().to_lowercase().as_str() {
            "1" | "chat" => return Ok(Commands::Chat),
            "2" | "auto" => return Ok(Commands::Auto { interval: None }),
            _ => out.write_all(b"Invalid choice. Please try again.\n").await?,
        }
    }
}

async fn wallet_provider(config: &Config) -> Result<Arc<EvmWalletProvider>> {
    let store = WalletStore::new(&config.wallet_data_path);
    let (wallet, source) = store.load_or_create(&config.network_id)?;
    tracing::info!(
        address = %wallet.address_string(),
        source = ?source,
        path = %store.path().display(),
        "Loaded agent wallet"
    );
    let provider = EvmWalletProvider::new(wallet, RpcConfig::from_env(), &config.network_id)?;
    Ok(Arc::new(provider))
}

async fn build_agent(config: &Config) -> Result<Agent> {
    let wallet = wallet_provider(config).await?;
    let network = wallet.network().await;

    let policy = PolicyConfig::load(&config.policy).await?;
    let mut actions = ActionRegistry::new(wallet)
        .with_provider(WalletActionProvider::new())
        .with_provider(SkywireActionProvider::new(config.skywire.clone()))
        .with_interceptor(Arc::new(PolicyInterceptor::new(policy)));
    if let Some(path) = &config.audit_log_path {
        actions = actions.with_interceptor(Arc::new(AuditLogInterceptor::new(path)));
    }

    let model = OpenAiChat::from_env(&config.llm)?;
    tracing::info!(
        network = %network,
        model = model.model(),
        actions = actions.actions().await.len(),
        "Agent ready"
    );

    let prompt = agent::system_prompt(&config.skywire, &network);
    Ok(Agent::new(Arc::new(model), actions, prompt, &config.llm))
}

async fn show_wallet(config: &Config) -> Result<()> {
    let wallet = wallet_provider(config).await?;
    let network = wallet.network().await;
    let balance = match wallet.balance().await {
        Ok(wei) => format!("{} ETH", skywire_agent::amount::format_ether(wei)),
        Err(e) => format!("unavailable ({})", e),
    };

    println!("Address: {}", wallet.export_wallet().await.address);
    println!("Network: {} (Chain ID: {})", network.network_id, network.chain_id);
    println!("Balance: {}", balance);
    println!("Wallet data: {}", config.wallet_data_path.display());
    Ok(())
}
