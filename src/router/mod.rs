//! Dual-agent router
//!
//! Supervises one child agent per chain, routes instructions to them over a
//! line protocol, and tracks submitted instructions as tasks.

mod chains;
mod process;
mod protocol;
mod tasks;

pub use chains::{chain_for_instruction, chain_name, resolve_chain};
pub use process::{AgentProcess, ProcessState, ProcessStatus};
pub use protocol::{is_sentinel, Framing, RequestFrame, ResponseFrame, SENTINEL_MARKERS};
pub use tasks::{TaskError, TaskRecord, TaskRegistry, TaskResult, TaskStatus};

use crate::config::AgentSpec;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Failed to start agent `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Timeout waiting for agent response on chain {chain_id} after {secs}s")]
    Timeout { chain_id: u64, secs: u64 },

    #[error("Agent {label} failed {failures} times in a row, not restarting")]
    RestartLimit { label: String, failures: u32 },

    #[error("No agent configured for chain {0}")]
    UnknownChain(u64),

    #[error("{0}")]
    AgentError(String),

    #[error("Agent {label} closed its output")]
    Closed { label: String },

    #[error("Agent {label} is shutting down")]
    ShuttingDown { label: String },

    #[error("Agent {label} did not become ready: {reason}")]
    NotReady { label: String, reason: String },

    #[error("Invalid chain_id: {0}. Must be 84532 (Base) or 11155420 (Optimism).")]
    InvalidChain(String),

    #[error("Agent command not found: {0}")]
    MissingCommand(String),
}

/// Something that can run an instruction on a chain's agent
#[async_trait]
pub trait InstructionDispatcher: Send + Sync {
    async fn execute(
        &self,
        chain_id: u64,
        instruction: &str,
        timeout: Duration,
    ) -> Result<String, RouterError>;

    async fn agents_status(&self) -> Vec<ProcessStatus>;
}

/// One supervised agent per chain
#[derive(Debug)]
pub struct AgentRouter {
    agents: BTreeMap<u64, AgentProcess>,
}

impl AgentRouter {
    pub fn new(specs: impl IntoIterator<Item = AgentSpec>) -> Self {
        let agents = specs
            .into_iter()
            .map(|spec| (spec.chain_id, AgentProcess::new(spec)))
            .collect();
        Self { agents }
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.agents.keys().copied()
    }

    pub fn agent(&self, chain_id: u64) -> Option<&AgentProcess> {
        self.agents.get(&chain_id)
    }

    /// Check that commands given as paths exist; bare names are left to PATH lookup
    pub fn validate(&self) -> Result<(), RouterError> {
        for agent in self.agents.values() {
            let command = &agent.spec().command;
            let is_path = command.contains(std::path::MAIN_SEPARATOR) || command.contains('/');
            if is_path && !Path::new(command).exists() {
                return Err(RouterError::MissingCommand(command.clone()));
            }
            info!(
                chain_id = agent.spec().chain_id,
                agent = %agent.spec().label,
                command = %command,
                "Using agent"
            );
        }
        Ok(())
    }

    pub async fn shutdown(&self) {
        for agent in self.agents.values() {
            agent.shutdown().await;
        }
    }
}

#[async_trait]
impl InstructionDispatcher for AgentRouter {
    async fn execute(
        &self,
        chain_id: u64,
        instruction: &str,
        timeout: Duration,
    ) -> Result<String, RouterError> {
        let agent = self
            .agents
            .get(&chain_id)
            .ok_or(RouterError::UnknownChain(chain_id))?;
        agent.execute(instruction, timeout).await
    }

    async fn agents_status(&self) -> Vec<ProcessStatus> {
        self.agents.values().map(AgentProcess::status).collect()
    }
}
