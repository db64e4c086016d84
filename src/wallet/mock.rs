//! In-memory wallet provider for action tests

use super::provider::{TxOutcome, WalletProvider};
use super::signer::{SecureWallet, WalletData};
use crate::network::Network;
use crate::{Error, Result};
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub struct MockWallet {
    pub address: Address,
    pub network: Mutex<Network>,
    pub balance: U256,
    /// eth_call responses keyed by (contract, selector)
    pub reads: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub calls: Mutex<Vec<(Address, Bytes)>>,
    pub estimate: Option<u64>,
    /// Receipt status per sent transaction, in order; missing entries succeed
    pub receipts: Mutex<VecDeque<bool>>,
    pub switches: Mutex<Vec<String>>,
}

impl MockWallet {
    pub fn new(address: Address, network: Network) -> Self {
        Self {
            address,
            network: Mutex::new(network),
            balance: U256::ZERO,
            reads: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            estimate: Some(100_000),
            receipts: Mutex::new(VecDeque::new()),
            switches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_read(self, contract: Address, selector: [u8; 4], response: Vec<u8>) -> Self {
        self.reads
            .lock()
            .unwrap()
            .insert((contract, selector), Bytes::from(response));
        self
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn current(&self) -> Network {
        self.network.lock().unwrap().clone()
    }
}

fn tx_hash(n: usize) -> B256 {
    keccak256(n.to_be_bytes())
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn name(&self) -> &str {
        "Mock Wallet"
    }

    fn address(&self) -> Address {
        self.address
    }

    async fn network(&self) -> Network {
        self.current()
    }

    async fn balance(&self) -> Result<U256> {
        Ok(self.balance)
    }

    async fn switch_network(&self, network_id: &str) -> Result<Network> {
        let target = Network::from_id(network_id)
            .ok_or_else(|| Error::InvalidArgument(format!("Unsupported network: {}", network_id)))?;
        self.switches.lock().unwrap().push(network_id.to_string());
        *self.network.lock().unwrap() = target.clone();
        Ok(target)
    }

    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        self.calls.lock().unwrap().push((to, calldata.clone()));
        let mut selector = [0u8; 4];
        if calldata.len() >= 4 {
            selector.copy_from_slice(&calldata[..4]);
        }
        self.reads
            .lock()
            .unwrap()
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| Error::Rpc("execution reverted".to_string()))
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64> {
        self.estimate
            .ok_or_else(|| Error::Rpc("execution reverted: revert: nope\"".to_string()))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx);
        Ok(tx_hash(sent.len()))
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxOutcome> {
        let success = self.receipts.lock().unwrap().pop_front().unwrap_or(true);
        Ok(TxOutcome {
            hash,
            success,
            gas_used: 21_000,
            block_number: Some(1),
        })
    }

    fn sign_message(&self, message: &str) -> Result<String> {
        Ok(format!("signed:{}", message))
    }

    async fn export_wallet(&self) -> WalletData {
        let mut data = SecureWallet::random().export(&self.current().network_id);
        data.address = self.address.to_checksum(None);
        data
    }
}
