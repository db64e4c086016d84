//! Skywire dual-chain agent toolkit
//!
//! An LLM-driven agent that manages SuperETH (sETH) on Base Sepolia and
//! Optimism Sepolia:
//! - Wraps and unwraps ETH, transfers sETH, and bridges it with
//!   agent-only crosschain burn/mint
//! - Exposes wallet actions (balances, transfers, contract reads) as tools
//! - Runs one agent per chain behind an HTTP router that tracks tasks
//!
//! # Safety Model
//!
//! - Every action call passes through the interceptor pipeline
//!   (policy, audit log)
//! - Private keys never leave the wallet module
//! - Transactions are simulated for gas before they are signed

pub mod actions;
pub mod agent;
pub mod amount;
pub mod client;
pub mod config;
pub mod interceptors;
pub mod llm;
pub mod network;
pub mod router;
pub mod server;
pub mod wallet;

mod error;

pub use config::{Config, RpcConfig};
pub use error::{Error, Result};
pub use network::Network;
