//! Supported EVM networks
//!
//! Networks are identified by a kebab-case network id (`base-sepolia`) and
//! an EIP-155 chain id. The two Skywire chains are testnets.

use serde::{Deserialize, Serialize};

/// Chain ID of Base Sepolia
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;
/// Chain ID of Optimism Sepolia
pub const OPTIMISM_SEPOLIA_CHAIN_ID: u64 = 11155420;

/// A network the wallet can be pointed at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Network {
    pub protocol_family: String,
    pub network_id: String,
    pub chain_id: u64,
    pub chain_name: String,
}

const KNOWN: &[(&str, u64, &str)] = &[
    ("ethereum-mainnet", 1, "Ethereum"),
    ("ethereum-sepolia", 11155111, "Ethereum Sepolia"),
    ("optimism", 10, "OP Mainnet"),
    ("optimism-sepolia", OPTIMISM_SEPOLIA_CHAIN_ID, "OP Sepolia"),
    ("base", 8453, "Base"),
    ("base-sepolia", BASE_SEPOLIA_CHAIN_ID, "Base Sepolia"),
];

impl Network {
    fn from_entry(&(network_id, chain_id, chain_name): &(&str, u64, &str)) -> Self {
        Self {
            protocol_family: "evm".to_string(),
            network_id: network_id.to_string(),
            chain_id,
            chain_name: chain_name.to_string(),
        }
    }

    /// Look up a network by its network id (case-insensitive)
    pub fn from_id(network_id: &str) -> Option<Self> {
        let wanted = network_id.trim().to_lowercase();
        KNOWN
            .iter()
            .find(|(id, _, _)| *id == wanted)
            .map(Self::from_entry)
    }

    /// Look up a network by chain id
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        KNOWN
            .iter()
            .find(|(_, id, _)| *id == chain_id)
            .map(Self::from_entry)
    }

    /// All networks this crate knows how to reach
    pub fn known() -> Vec<Self> {
        KNOWN.iter().map(Self::from_entry).collect()
    }

    pub fn base_sepolia() -> Self {
        Self::from_entry(&KNOWN[5])
    }

    pub fn optimism_sepolia() -> Self {
        Self::from_entry(&KNOWN[3])
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.network_id)
    }
}
