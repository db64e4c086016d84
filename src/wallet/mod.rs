//! Wallet management
//!
//! Private keys live in [`SecureWallet`]; everything else reaches the chain
//! through the [`WalletProvider`] trait.

mod provider;
mod signer;
mod simulator;
mod store;

#[cfg(test)]
pub(crate) mod mock;

pub use provider::{EvmWalletProvider, TxOutcome, WalletProvider};
pub use signer::{SecureWallet, WalletData, WALLET_TYPE_PRIVATE_KEY};
pub use simulator::TransactionSimulator;
pub use store::{WalletSource, WalletStore, PRIVATE_KEY_ENV};
