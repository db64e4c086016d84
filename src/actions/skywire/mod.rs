//! Skywire actions: SuperETH cross-chain mint/burn and ETH wrapping
//!
//! Mint and burn are restricted to the agent address. A cross-chain
//! transfer is a burn on the source chain followed by a mint of the same
//! amount on the destination chain.

mod contract;
mod schemas;

use super::{parse_address, parse_args, Action, ActionError, ActionProvider};
use crate::amount::{format_ether, parse_ether, parse_token_amount};
use crate::config::SkywireConfig;
use crate::network::Network;
use crate::wallet::{TransactionSimulator, TxOutcome, WalletProvider};
use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

pub use contract::{supported_networks, ISuperETH};
pub use schemas::{
    CrosschainBurnArgs, CrosschainMintArgs, CrosschainTransferArgs, DepositEthArgs,
    WithdrawEthArgs,
};

/// A confirmed mint or burn
#[derive(Debug, Clone)]
pub struct CrosschainReceipt {
    pub amount: U256,
    pub account: Address,
    pub network: Network,
    pub outcome: TxOutcome,
}

pub struct SkywireActionProvider {
    config: SkywireConfig,
    networks: Vec<Network>,
}

impl SkywireActionProvider {
    pub fn new(config: SkywireConfig) -> Self {
        Self {
            config,
            networks: supported_networks(),
        }
    }

    /// Resolve the chain to act on and make it the active network
    async fn activate(
        &self,
        wallet: &dyn WalletProvider,
        chain_id: Option<u64>,
    ) -> Result<Network, ActionError> {
        let current = wallet.network().await;
        let chain_id = match chain_id {
            None | Some(0) => current.chain_id,
            Some(id) => id,
        };

        let target = self
            .networks
            .iter()
            .find(|n| n.chain_id == chain_id)
            .cloned()
            .ok_or(ActionError::UnsupportedChain(chain_id))?;

        if target.chain_id != current.chain_id {
            wallet
                .switch_network(&target.network_id)
                .await
                .map_err(|e| {
                    warn!(error = %e, network = %target, "Network switch failed");
                    ActionError::SwitchFailed {
                        network: target.network_id.clone(),
                        chain_id,
                    }
                })?;
        }
        Ok(target)
    }

    fn ensure_agent(&self, wallet: &dyn WalletProvider) -> Result<(), ActionError> {
        if wallet.address() != self.config.agent_address {
            return Err(ActionError::Precondition(format!(
                "Only the agent address {} can perform cross-chain operations, but the wallet address is {}",
                self.config.agent_address,
                wallet.address()
            )));
        }
        Ok(())
    }

    async fn seth_balance(
        &self,
        wallet: &dyn WalletProvider,
        account: Address,
    ) -> Result<U256, ActionError> {
        let raw = wallet
            .read_contract(
                self.config.contract_address,
                ISuperETH::balanceOfCall { account }.abi_encode().into(),
            )
            .await?;
        ISuperETH::balanceOfCall::abi_decode_returns(&raw)
            .map_err(|e| ActionError::Failed(format!("Bad balanceOf response: {}", e)))
    }

    fn call(&self, calldata: Vec<u8>) -> TransactionRequest {
        TransactionRequest::default()
            .to(self.config.contract_address)
            .input(calldata.into())
    }

    async fn confirm(
        &self,
        wallet: &dyn WalletProvider,
        tx: TransactionRequest,
        action: &str,
    ) -> Result<TxOutcome, ActionError> {
        let hash: B256 = wallet.send_transaction(tx).await?;
        info!(action, %hash, "Transaction sent, waiting for receipt");
        let outcome = wallet.wait_for_receipt(hash).await?;
        if !outcome.success {
            return Err(ActionError::TransactionFailed {
                action: action.to_string(),
                hash: hash.to_string(),
                status: outcome.status_label().to_string(),
            });
        }
        Ok(outcome)
    }

    pub async fn burn(
        &self,
        wallet: &dyn WalletProvider,
        args: &CrosschainBurnArgs,
    ) -> Result<CrosschainReceipt, ActionError> {
        let amount = parse_token_amount(&args.amount)?;
        let from = parse_address("from_address", &args.from_address)?;
        let network = self.activate(wallet, args.chain_id).await?;

        let balance = self.seth_balance(wallet, from).await?;
        if balance < amount {
            return Err(ActionError::Precondition(format!(
                "Insufficient balance. {} has {} tokens but attempted to burn {}",
                from, balance, amount
            )));
        }
        self.ensure_agent(wallet)?;

        let tx = self.call(ISuperETH::crosschainBurnCall { from, amount }.abi_encode());
        let gas =
            TransactionSimulator::estimate_or_fallback(wallet, &tx, self.config.fallback_gas).await;
        let outcome = self.confirm(wallet, tx.gas_limit(gas), "Burn").await?;

        Ok(CrosschainReceipt {
            amount,
            account: from,
            network,
            outcome,
        })
    }

    pub async fn mint(
        &self,
        wallet: &dyn WalletProvider,
        args: &CrosschainMintArgs,
    ) -> Result<CrosschainReceipt, ActionError> {
        let amount = parse_token_amount(&args.amount)?;
        let to = parse_address("to_address", &args.to_address)?;
        let network = self.activate(wallet, args.chain_id).await?;
        self.ensure_agent(wallet)?;

        let tx = self.call(ISuperETH::crosschainMintCall { to, amount }.abi_encode());
        let gas =
            TransactionSimulator::estimate_or_fallback(wallet, &tx, self.config.fallback_gas).await;
        let outcome = self.confirm(wallet, tx.gas_limit(gas), "Mint").await?;

        Ok(CrosschainReceipt {
            amount,
            account: to,
            network,
            outcome,
        })
    }

    async fn transfer(
        &self,
        wallet: &dyn WalletProvider,
        args: CrosschainTransferArgs,
    ) -> Result<String, ActionError> {
        let (source, destination) = match (args.source_chain_id, args.destination_chain_id) {
            (Some(s), Some(d)) if s != 0 && d != 0 => (s, d),
            _ => {
                return Err(ActionError::InvalidArguments(
                    "source_chain_id and destination_chain_id are both required".to_string(),
                ))
            }
        };

        let burn_args = CrosschainBurnArgs {
            amount: args.amount.clone(),
            from_address: args.from_address.clone(),
            chain_id: Some(source),
        };
        let burned = self.burn(wallet, &burn_args).await.map_err(|e| {
            ActionError::Failed(format!(
                "Cross-chain transfer failed during burn step: {}",
                e
            ))
        })?;

        let mint_args = CrosschainMintArgs {
            amount: args.amount.clone(),
            to_address: args.to_address.clone(),
            chain_id: Some(destination),
        };
        let minted = self.mint(wallet, &mint_args).await.map_err(|e| {
            ActionError::Failed(format!(
                "Cross-chain transfer partially completed. Burn was successful ({}), but mint failed: {}",
                burned.outcome.hash, e
            ))
        })?;

        Ok(format!(
            "Cross-chain transfer completed successfully. {} {}",
            burned_message(&burned),
            minted_message(&minted)
        ))
    }

    async fn deposit(
        &self,
        wallet: &dyn WalletProvider,
        args: DepositEthArgs,
    ) -> Result<String, ActionError> {
        let value = parse_ether(&args.amount)?;
        if value.is_zero() {
            return Err(ActionError::InvalidArguments(
                "Amount must be greater than 0".to_string(),
            ));
        }
        let network = self.activate(wallet, args.chain_id).await?;

        let tx = self
            .call(ISuperETH::depositCall {}.abi_encode())
            .value(value)
            .gas_limit(self.config.eth_wrap_gas);
        let outcome = self.confirm(wallet, tx, "Deposit").await?;

        Ok(format!(
            "Successfully deposited {} ETH to receive sETH on {}. Transaction hash: {}",
            args.amount.trim(),
            network.network_id,
            outcome.hash
        ))
    }

    async fn withdraw(
        &self,
        wallet: &dyn WalletProvider,
        args: WithdrawEthArgs,
    ) -> Result<String, ActionError> {
        let amount = parse_ether(&args.amount)?;
        if amount.is_zero() {
            return Err(ActionError::InvalidArguments(
                "Amount must be greater than 0".to_string(),
            ));
        }
        let network = self.activate(wallet, args.chain_id).await?;

        let balance = self.seth_balance(wallet, wallet.address()).await?;
        if balance < amount {
            return Err(ActionError::Precondition(format!(
                "Insufficient balance. You have {} sETH but attempted to withdraw {} ETH",
                format_ether(balance),
                args.amount.trim()
            )));
        }

        let tx = self
            .call(ISuperETH::withdrawCall { amount }.abi_encode())
            .gas_limit(self.config.eth_wrap_gas);
        let outcome = self.confirm(wallet, tx, "Withdraw").await?;

        Ok(format!(
            "Successfully withdrew {} ETH by burning sETH on {}. Transaction hash: {}",
            args.amount.trim(),
            network.network_id,
            outcome.hash
        ))
    }
}

fn burned_message(r: &CrosschainReceipt) -> String {
    format!(
        "Successfully burned {} tokens from {} on {}. Transaction hash: {}",
        r.amount, r.account, r.network.network_id, r.outcome.hash
    )
}

fn minted_message(r: &CrosschainReceipt) -> String {
    format!(
        "Successfully minted {} tokens to {} on {}. Transaction hash: {}",
        r.amount, r.account, r.network.network_id, r.outcome.hash
    )
}

#[async_trait]
impl ActionProvider for SkywireActionProvider {
    fn name(&self) -> &str {
        "skywire"
    }

    fn actions(&self) -> Vec<Action> {
        vec![
            Action::new::<CrosschainBurnArgs>(
                "crosschain_burn",
                "Burn SuperETH (sETH) from an address on one chain. Only the agent address may call this.",
            ),
            Action::new::<CrosschainMintArgs>(
                "crosschain_mint",
                "Mint SuperETH (sETH) to an address on one chain. Only the agent address may call this.",
            ),
            Action::new::<CrosschainTransferArgs>(
                "crosschain_transfer",
                "Bridge sETH: burn on the source chain, then mint the same amount on the destination chain.",
            ),
            Action::new::<DepositEthArgs>(
                "deposit_eth",
                "Deposit ETH into the SuperETH contract to receive sETH 1:1.",
            ),
            Action::new::<WithdrawEthArgs>(
                "withdraw_eth",
                "Withdraw ETH by returning sETH to the SuperETH contract.",
            ),
        ]
    }

    fn supports_network(&self, network: &Network) -> bool {
        self.networks.iter().any(|n| n.chain_id == network.chain_id)
    }

    async fn invoke(
        &self,
        action: &str,
        wallet: &dyn WalletProvider,
        args: Value,
    ) -> Result<String, ActionError> {
        match action {
            "crosschain_burn" => {
                let args: CrosschainBurnArgs = parse_args(args)?;
                Ok(burned_message(&self.burn(wallet, &args).await?))
            }
            "crosschain_mint" => {
                let args: CrosschainMintArgs = parse_args(args)?;
                Ok(minted_message(&self.mint(wallet, &args).await?))
            }
            "crosschain_transfer" => self.transfer(wallet, parse_args(args)?).await,
            "deposit_eth" => self.deposit(wallet, parse_args(args)?).await,
            "withdraw_eth" => self.withdraw(wallet, parse_args(args)?).await,
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}
