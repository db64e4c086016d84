//! Secure wallet implementation
//!
//! SECURITY: Keys are held in alloy's PrivateKeySigner.
//! - `SecureWallet` has no Serialize impl
//! - The only way key material leaves is `export`, for the wallet data file
//! - Keys are never logged; both Debug impls redact them

use crate::{Error, Result};
use alloy::hex;
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::{Deserialize, Serialize};

/// Secure wallet that protects private keys
pub struct SecureWallet {
    signer: PrivateKeySigner,
    address: Address,
    /// Ethereum wallet for alloy integration
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Create a wallet from an environment variable holding a hex private key
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key_hex = std::env::var(var_name).map_err(|_| {
            Error::Wallet(format!(
                "Environment variable {} not set. Required for wallet initialization.",
                var_name
            ))
        })?;

        Self::from_hex(&key_hex)
    }

    /// Create a wallet from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))?;

        Ok(Self::from_signer(signer))
    }

    /// Generate a fresh random key
    pub fn random() -> Self {
        Self::from_signer(PrivateKeySigner::random())
    }

    fn from_signer(signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        let wallet = EthereumWallet::from(signer.clone());
        Self {
            signer,
            address,
            wallet,
        }
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the address as a checksummed string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Get a reference to the EthereumWallet for use with alloy providers
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }

    /// Sign a message with the EIP-191 personal-sign prefix, returning 0x-hex
    pub fn sign_message(&self, message: &[u8]) -> Result<String> {
        let signature = self
            .signer
            .sign_message_sync(message)
            .map_err(|e| Error::Wallet(format!("Signing failed: {}", e)))?;
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }

    /// Export key material for persistence
    pub fn export(&self, network_id: &str) -> WalletData {
        WalletData {
            address: self.address_string(),
            network_id: network_id.to_string(),
            wallet_type: WALLET_TYPE_PRIVATE_KEY.to_string(),
            private_key: hex::encode_prefixed(self.signer.to_bytes()),
        }
    }
}

impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

pub const WALLET_TYPE_PRIVATE_KEY: &str = "private_key";

/// Exported wallet, as written to the wallet data file
#[derive(Clone, Serialize, Deserialize)]
pub struct WalletData {
    pub address: String,
    pub network_id: String,
    pub wallet_type: String,
    pub private_key: String,
}

impl WalletData {
    /// Rebuild the signing wallet, checking the stored address matches the key
    pub fn to_wallet(&self) -> Result<SecureWallet> {
        let wallet = SecureWallet::from_hex(&self.private_key)?;
        if !self.address.is_empty() && !wallet.address_string().eq_ignore_ascii_case(&self.address)
        {
            return Err(Error::Wallet(format!(
                "Stored address {} does not match private key",
                self.address
            )));
        }
        Ok(wallet)
    }
}

impl std::fmt::Debug for WalletData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletData")
            .field("address", &self.address)
            .field("network_id", &self.network_id)
            .field("wallet_type", &self.wallet_type)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known dev key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_hex() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();

        assert_eq!(
            wallet.address_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let data = wallet.export("base-sepolia");

        for debug_str in [format!("{:?}", wallet), format!("{:?}", data)] {
            assert!(!debug_str.contains("ac0974bec"));
            assert!(debug_str.contains("[REDACTED]"));
        }
    }

    #[test]
    fn export_round_trips_through_wallet_data() {
        let wallet = SecureWallet::random();
        let data = wallet.export("optimism-sepolia");
        assert_eq!(data.wallet_type, "private_key");
        assert_eq!(data.network_id, "optimism-sepolia");

        let restored = data.to_wallet().unwrap();
        assert_eq!(restored.address(), wallet.address());
    }

    #[test]
    fn mismatched_address_is_rejected() {
        let mut data = SecureWallet::from_hex(TEST_KEY).unwrap().export("base-sepolia");
        data.address = "0x0000000000000000000000000000000000000001".to_string();
        assert!(data.to_wallet().is_err());
    }

    #[test]
    fn sign_message_produces_65_byte_signature() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let sig = wallet.sign_message(b"hello").unwrap();
        assert!(sig.starts_with("0x"));
        assert_eq!(sig.len(), 2 + 65 * 2);
    }
}
