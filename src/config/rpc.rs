//! RPC endpoint configuration
//!
//! Resolution order per network:
//! 1. Per-network env vars (BASE_SEPOLIA_RPC_URL, OPTIMISM_SEPOLIA_RPC_URL, ...)
//! 2. ALCHEMY_API_KEY - builds URLs automatically
//! 3. Public RPC fallbacks - rate limited, for testing only
//!
//! ```bash
//! export BASE_SEPOLIA_RPC_URL="https://base-sepolia.g.alchemy.com/v2/YOUR_KEY"
//! export OPTIMISM_SEPOLIA_RPC_URL="https://opt-sepolia.g.alchemy.com/v2/YOUR_KEY"
//! ```

use std::collections::HashMap;

/// RPC configuration for multiple chains
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const ETHEREUM_SEPOLIA: u64 = 11155111;
    pub const OPTIMISM: u64 = 10;
    pub const OPTIMISM_SEPOLIA: u64 = crate::network::OPTIMISM_SEPOLIA_CHAIN_ID;
    pub const BASE: u64 = 8453;
    pub const BASE_SEPOLIA: u64 = crate::network::BASE_SEPOLIA_CHAIN_ID;
}

/// (chain, env var, alchemy subdomain, public fallback)
const ENDPOINTS: &[(u64, &str, &str, &str)] = &[
    (
        chains::ETHEREUM,
        "ETH_RPC_URL",
        "eth-mainnet",
        "https://eth.llamarpc.com",
    ),
    (
        chains::ETHEREUM_SEPOLIA,
        "ETH_SEPOLIA_RPC_URL",
        "eth-sepolia",
        "https://ethereum-sepolia-rpc.publicnode.com",
    ),
    (
        chains::OPTIMISM,
        "OPTIMISM_RPC_URL",
        "opt-mainnet",
        "https://mainnet.optimism.io",
    ),
    (
        chains::OPTIMISM_SEPOLIA,
        "OPTIMISM_SEPOLIA_RPC_URL",
        "opt-sepolia",
        "https://sepolia.optimism.io",
    ),
    (
        chains::BASE,
        "BASE_RPC_URL",
        "base-mainnet",
        "https://mainnet.base.org",
    ),
    (
        chains::BASE_SEPOLIA,
        "BASE_SEPOLIA_RPC_URL",
        "base-sepolia",
        "https://sepolia.base.org",
    ),
];

const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve URLs through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let alchemy_key = lookup(ALCHEMY_API_KEY).filter(|k| !k.is_empty());
        let mut urls = HashMap::new();

        for &(chain_id, var, alchemy_host, public) in ENDPOINTS {
            let url = if let Some(url) = lookup(var).filter(|u| !u.is_empty()) {
                tracing::debug!(chain_id, var, "Using per-chain RPC URL");
                url
            } else if let Some(key) = &alchemy_key {
                format!("https://{}.g.alchemy.com/v2/{}", alchemy_host, key)
            } else {
                tracing::debug!(chain_id, url = public, "Using public RPC (rate limited)");
                public.to_string()
            };
            urls.insert(chain_id, url);
        }

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
