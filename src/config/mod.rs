//! Configuration for the Skywire agent, its LLM loop and the dual-agent router

pub mod rpc;

use crate::network::{BASE_SEPOLIA_CHAIN_ID, OPTIMISM_SEPOLIA_CHAIN_ID};
use crate::router::Framing;
use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use rpc::RpcConfig;

/// OpenAI API key environment variable name
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Network override environment variable name
pub const NETWORK_ID_ENV: &str = "NETWORK_ID";

/// Default policy behavior when policy.json is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDefaultMode {
    #[default]
    AllowAll,
    DefaultDeny,
}

/// Policy settings for action execution
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicySettings {
    /// Default mode when policy.json is missing
    #[serde(default)]
    pub default_mode: PolicyDefaultMode,
    /// Require policy.json to be present (fail closed if missing)
    #[serde(default)]
    pub require_file: bool,
    /// Location of policy.json
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Chat model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    /// Upper bound on model calls per user turn
    pub max_steps: usize,
    /// Conversation messages kept in memory, system prompt excluded
    pub max_history_messages: usize,
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_steps: 10,
            max_history_messages: 40,
            temperature: None,
        }
    }
}

/// SuperETH deployment and gas settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkywireConfig {
    /// SuperETH contract, same address on every supported chain
    pub contract_address: Address,
    /// The only account allowed to crosschain mint/burn
    pub agent_address: Address,
    /// Gas limit used when estimation fails for mint/burn
    pub fallback_gas: u64,
    /// Fixed gas limit for deposit/withdraw
    pub eth_wrap_gas: u64,
}

impl Default for SkywireConfig {
    fn default() -> Self {
        Self {
            contract_address: address!("EBE8Ca83dfFeaa2288a70B4f1e29EcD089d325E2"),
            agent_address: address!("888dc43F8aF62eafb2B542e309B836CA9683E410"),
            fallback_gas: 5_000_000,
            eth_wrap_gas: 300_000,
        }
    }
}

/// One supervised child agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub chain_id: u64,
    pub label: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub framing: Framing,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// How long a framed child may take to report ready
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
    /// Fixed settle time for sentinel children, which never report ready
    #[serde(default = "default_startup_grace_secs")]
    pub startup_grace_secs: u64,
    /// Consecutive failed starts tolerated before the agent is given up on
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_startup_grace_secs() -> u64 {
    2
}

fn default_max_restarts() -> u32 {
    3
}

impl AgentSpec {
    /// A child running this crate's own agent binary in serve mode
    pub fn serve(chain_id: u64, label: &str, network_id: &str) -> Self {
        Self {
            chain_id,
            label: label.to_string(),
            command: "skywire-agent".to_string(),
            args: vec![
                "--network".to_string(),
                network_id.to_string(),
                "serve".to_string(),
            ],
            framing: Framing::Json,
            env: HashMap::new(),
            working_dir: None,
            startup_timeout_secs: default_startup_timeout_secs(),
            startup_grace_secs: default_startup_grace_secs(),
            max_restarts: default_max_restarts(),
        }
    }
}

/// HTTP router settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub bind_addr: String,
    pub default_timeout_secs: u64,
    pub max_timeout_secs: u64,
    /// Task records retained in memory
    pub max_tasks: usize,
    pub agents: Vec<AgentSpec>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            default_timeout_secs: 60,
            max_timeout_secs: 600,
            max_tasks: 1000,
            agents: vec![
                AgentSpec::serve(BASE_SEPOLIA_CHAIN_ID, "base", "base-sepolia"),
                AgentSpec::serve(OPTIMISM_SEPOLIA_CHAIN_ID, "optimism", "optimism-sepolia"),
            ],
        }
    }
}

/// Autonomous mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoConfig {
    pub interval_secs: u64,
}

impl Default for AutoConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network the wallet starts on
    pub network_id: String,
    /// Where exported wallet data is persisted
    pub wallet_data_path: PathBuf,
    /// Path to audit log file
    pub audit_log_path: Option<String>,
    pub policy: PolicySettings,
    pub llm: LlmConfig,
    pub skywire: SkywireConfig,
    pub router: RouterConfig,
    pub auto: AutoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_id: "base-sepolia".to_string(),
            wallet_data_path: PathBuf::from("wallet_data.json"),
            audit_log_path: Some("audit.jsonl".to_string()),
            policy: PolicySettings::default(),
            llm: LlmConfig::default(),
            skywire: SkywireConfig::default(),
            router: RouterConfig::default(),
            auto: AutoConfig::default(),
        }
    }
}

impl Config {
    /// Read a JSON config file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` if given, otherwise defaults; `NETWORK_ID` overrides the network
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(network_id) = std::env::var(NETWORK_ID_ENV) {
            if !network_id.is_empty() {
                config.network_id = network_id;
            }
        }
        Ok(config)
    }
}
