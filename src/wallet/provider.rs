//! Wallet provider abstraction
//!
//! Actions talk to the chain only through [`WalletProvider`]. The EVM
//! implementation signs locally with [`SecureWallet`] and sends through an
//! alloy HTTP provider for the active network.

use super::signer::{SecureWallet, WalletData};
use crate::config::RpcConfig;
use crate::network::Network;
use crate::{Error, Result};
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Mined transaction summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: B256,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

impl TxOutcome {
    pub fn status_label(&self) -> &'static str {
        if self.success {
            "success"
        } else {
            "reverted"
        }
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    fn address(&self) -> Address;

    /// Currently active network
    async fn network(&self) -> Network;

    async fn chain_id(&self) -> u64 {
        self.network().await.chain_id
    }

    /// Native balance of the wallet in wei
    async fn balance(&self) -> Result<U256>;

    /// Point the wallet at another network; a no-op when already there
    async fn switch_network(&self, network_id: &str) -> Result<Network>;

    /// eth_call against `to` from the wallet address
    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64>;

    /// Sign and broadcast; returns as soon as the node accepts it
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256>;

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxOutcome>;

    async fn native_transfer(&self, to: Address, value: U256) -> Result<B256> {
        let tx = TransactionRequest::default().to(to).value(value);
        self.send_transaction(tx).await
    }

    /// EIP-191 signature over `message`
    fn sign_message(&self, message: &str) -> Result<String>;

    async fn export_wallet(&self) -> WalletData;
}

/// Wallet provider for EVM chains backed by a local private key
pub struct EvmWalletProvider {
    wallet: SecureWallet,
    rpc: RpcConfig,
    active: RwLock<ActiveNetwork>,
    providers: Mutex<HashMap<u64, DynProvider>>,
    receipt_timeout: Duration,
    receipt_poll_interval: Duration,
}

struct ActiveNetwork {
    network: Network,
    provider: DynProvider,
}

impl EvmWalletProvider {
    pub const NAME: &'static str = "EVM Private Key Wallet";

    pub fn new(wallet: SecureWallet, rpc: RpcConfig, network_id: &str) -> Result<Self> {
        let network = Network::from_id(network_id)
            .ok_or_else(|| Error::Config(format!("Unsupported network: {}", network_id)))?;
        let provider = connect(&wallet, &rpc, &network)?;

        let mut providers = HashMap::new();
        providers.insert(network.chain_id, provider.clone());

        info!(address = %wallet.address(), network = %network, "Wallet provider initialized");

        Ok(Self {
            wallet,
            rpc,
            active: RwLock::new(ActiveNetwork { network, provider }),
            providers: Mutex::new(providers),
            receipt_timeout: Duration::from_secs(120),
            receipt_poll_interval: Duration::from_secs(2),
        })
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    async fn provider(&self) -> DynProvider {
        self.active.read().await.provider.clone()
    }
}

fn connect(wallet: &SecureWallet, rpc: &RpcConfig, network: &Network) -> Result<DynProvider> {
    let rpc_url = rpc.get(network.chain_id).ok_or_else(|| {
        Error::Config(format!(
            "No RPC URL configured for {} (chain {})",
            network.network_id, network.chain_id
        ))
    })?;
    let url: url::Url = rpc_url
        .parse()
        .map_err(|e| Error::Config(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

    Ok(ProviderBuilder::new()
        .wallet(wallet.wallet().clone())
        .connect_http(url)
        .erased())
}

fn rpc_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Rpc(format!("{}: {}", context, e))
}

#[async_trait]
impl WalletProvider for EvmWalletProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn network(&self) -> Network {
        self.active.read().await.network.clone()
    }

    async fn balance(&self) -> Result<U256> {
        self.provider()
            .await
            .get_balance(self.wallet.address())
            .await
            .map_err(|e| rpc_err("Failed to get balance", e))
    }

    async fn switch_network(&self, network_id: &str) -> Result<Network> {
        let target = Network::from_id(network_id)
            .ok_or_else(|| Error::InvalidArgument(format!("Unsupported network: {}", network_id)))?;

        let mut active = self.active.write().await;
        if active.network == target {
            return Ok(target);
        }

        let provider = {
            let mut providers = self.providers.lock().await;
            match providers.get(&target.chain_id) {
                Some(provider) => provider.clone(),
                None => {
                    let provider = connect(&self.wallet, &self.rpc, &target)?;
                    providers.insert(target.chain_id, provider.clone());
                    provider
                }
            }
        };

        info!(from = %active.network, to = %target, "Switched network");
        *active = ActiveNetwork {
            network: target.clone(),
            provider,
        };
        Ok(target)
    }

    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default()
            .from(self.wallet.address())
            .to(to)
            .input(calldata.into());
        self.provider()
            .await
            .call(tx)
            .await
            .map_err(|e| rpc_err("Contract call failed", e))
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64> {
        let tx = tx.clone().from(self.wallet.address());
        self.provider()
            .await
            .estimate_gas(tx)
            .await
            .map_err(|e| rpc_err("Gas estimation failed", e))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let tx = tx.from(self.wallet.address());
        let pending = self
            .provider()
            .await
            .send_transaction(tx)
            .await
            .map_err(|e| rpc_err("Failed to send transaction", e))?;
        let hash = *pending.tx_hash();
        debug!(%hash, "Transaction broadcast");
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxOutcome> {
        let provider = self.provider().await;
        let deadline = tokio::time::Instant::now() + self.receipt_timeout;

        loop {
            let receipt = provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| rpc_err("Failed to fetch receipt", e))?;

            if let Some(receipt) = receipt {
                return Ok(TxOutcome {
                    hash,
                    success: receipt.status(),
                    gas_used: receipt.gas_used(),
                    block_number: receipt.block_number(),
                });
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Rpc(format!(
                    "Timed out waiting for receipt of {}",
                    hash
                )));
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }

    fn sign_message(&self, message: &str) -> Result<String> {
        self.wallet.sign_message(message.as_bytes())
    }

    async fn export_wallet(&self) -> WalletData {
        let network = self.network().await;
        self.wallet.export(&network.network_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> EvmWalletProvider {
        let rpc = RpcConfig::from_lookup(|_| None);
        EvmWalletProvider::new(SecureWallet::random(), rpc, "base-sepolia").unwrap()
    }

    #[tokio::test]
    async fn starts_on_configured_network() {
        let wallet = provider();
        assert_eq!(wallet.network().await, Network::base_sepolia());
        assert_eq!(wallet.chain_id().await, 84532);
    }

    #[tokio::test]
    async fn switching_is_local_until_rpc_is_used() {
        let wallet = provider();
        let network = wallet.switch_network("optimism-sepolia").await.unwrap();
        assert_eq!(network.chain_id, 11155420);
        assert_eq!(wallet.network().await, network);

        let again = wallet.switch_network("optimism-sepolia").await.unwrap();
        assert_eq!(again, network);
    }

    #[tokio::test]
    async fn unknown_network_is_rejected() {
        let wallet = provider();
        assert!(wallet.switch_network("solana-devnet").await.is_err());
        assert_eq!(wallet.network().await, Network::base_sepolia());
    }

    #[tokio::test]
    async fn network_without_rpc_is_rejected() {
        let mut urls = HashMap::new();
        urls.insert(84532, "https://sepolia.base.org".to_string());
        let wallet = EvmWalletProvider::new(
            SecureWallet::random(),
            RpcConfig::with_urls(urls),
            "base-sepolia",
        )
        .unwrap();
        let err = wallet.switch_network("optimism-sepolia").await.unwrap_err();
        assert!(err.to_string().contains("No RPC URL"));
    }

    #[tokio::test]
    async fn export_tracks_active_network() {
        let wallet = provider();
        wallet.switch_network("optimism-sepolia").await.unwrap();
        let data = wallet.export_wallet().await;
        assert_eq!(data.network_id, "optimism-sepolia");
        assert_eq!(data.address, wallet.address().to_checksum(None));
    }
}
