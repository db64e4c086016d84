use crate::actions::{de_amount, de_chain_id};
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CrosschainBurnArgs {
    /// Amount of sETH: an integer is wei, a decimal like "0.1" is ether
    #[serde(deserialize_with = "de_amount")]
    pub amount: String,
    /// Address whose tokens are burned
    pub from_address: String,
    /// Chain to burn on; omit or 0 for the current chain
    #[serde(default, deserialize_with = "de_chain_id")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CrosschainMintArgs {
    /// Amount of sETH: an integer is wei, a decimal like "0.1" is ether
    #[serde(deserialize_with = "de_amount")]
    pub amount: String,
    /// Address receiving the minted tokens
    pub to_address: String,
    /// Chain to mint on; omit or 0 for the current chain
    #[serde(default, deserialize_with = "de_chain_id")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CrosschainTransferArgs {
    /// Amount of sETH: an integer is wei, a decimal like "0.1" is ether
    #[serde(deserialize_with = "de_amount")]
    pub amount: String,
    pub from_address: String,
    pub to_address: String,
    #[serde(deserialize_with = "de_chain_id")]
    pub source_chain_id: Option<u64>,
    #[serde(deserialize_with = "de_chain_id")]
    pub destination_chain_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DepositEthArgs {
    /// Amount of ETH to wrap, e.g. "0.01"
    #[serde(deserialize_with = "de_amount")]
    pub amount: String,
    #[serde(default, deserialize_with = "de_chain_id")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WithdrawEthArgs {
    /// Amount of sETH to unwrap back to ETH, e.g. "0.01"
    #[serde(deserialize_with = "de_amount")]
    pub amount: String,
    #[serde(default, deserialize_with = "de_chain_id")]
    pub chain_id: Option<u64>,
}
