//! Generic wallet actions: details, balances, transfers, network switching
//! and arbitrary contract calls from a JSON ABI.

use super::{de_amount, parse_address, parse_args, Action, ActionError, ActionProvider};
use crate::amount::{format_ether, format_units, parse_ether};
use crate::network::Network;
use crate::wallet::{TransactionSimulator, WalletProvider};
use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi, Param, StateMutability};
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// Gas headroom added on top of estimates for arbitrary contract calls
const CALL_GAS_BUFFER_PERCENT: u64 = 20;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetWalletDetailsArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetBalanceArgs {
    /// "eth" for the native balance, or an ERC-20 contract address
    #[serde(default)]
    pub asset: Option<String>,
    /// Network id to check; must be the current network
    #[serde(default)]
    pub network: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NativeTransferArgs {
    /// Destination address
    pub to: String,
    /// Amount of ETH as a decimal string, e.g. "0.01"
    #[serde(deserialize_with = "de_amount")]
    pub value: String,
    #[serde(default)]
    pub network: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SwitchNetworkArgs {
    /// Target network id, e.g. "base-sepolia" or "optimism-sepolia"
    pub network_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CallContractArgs {
    pub contract_address: String,
    /// Contract ABI as a JSON string, array of items, or object
    pub abi: Value,
    pub function_name: String,
    /// Arguments by parameter name (object) or position (array); "value" in ETH for payable functions
    #[serde(default)]
    pub inputs: Option<Value>,
    #[serde(default)]
    pub network: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SignMessageArgs {
    pub message: String,
}

/// Actions available on every EVM network
#[derive(Debug, Default)]
pub struct WalletActionProvider;

impl WalletActionProvider {
    pub fn new() -> Self {
        Self
    }

    async fn get_wallet_details(
        &self,
        wallet: &dyn WalletProvider,
    ) -> Result<String, ActionError> {
        let network = wallet.network().await;
        let balance = wallet.balance().await?;
        Ok(format!(
            "Wallet Details:\n\
             - Provider: {}\n\
             - Address: {}\n\
             - Network:\n  \
               * Protocol Family: {}\n  \
               * Network ID: {}\n  \
               * Chain ID: {}\n\
             - Native Balance: {}",
            wallet.name(),
            wallet.address().to_checksum(None),
            network.protocol_family,
            network.network_id,
            network.chain_id,
            balance
        ))
    }

    async fn get_balance(
        &self,
        wallet: &dyn WalletProvider,
        args: GetBalanceArgs,
    ) -> Result<String, ActionError> {
        let network = wallet.network().await;
        if let Some(message) = network_guard(&network, args.network.as_deref(), "checking balance")
        {
            return Ok(message);
        }

        let token = args
            .asset
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.eq_ignore_ascii_case("eth") && !a.is_empty());

        if let Some(asset) = token {
            let token = Address::from_str(asset).map_err(|_| {
                ActionError::InvalidArguments(format!(
                    "asset must be \"eth\" or a token contract address, got {}",
                    asset
                ))
            })?;
            match erc20_balance(wallet, token).await {
                Ok(formatted) => return Ok(format!("Balance of {}: {}", asset, formatted)),
                Err(e) => {
                    warn!(
                        asset,
                        error = %e,
                        "Token balance lookup failed, reporting native balance"
                    );
                }
            }
        }

        let balance = wallet.balance().await?;
        Ok(format!(
            "Balance on {}: {} ETH",
            network.network_id,
            format_ether(balance)
        ))
    }

    async fn native_transfer(
        &self,
        wallet: &dyn WalletProvider,
        args: NativeTransferArgs,
    ) -> Result<String, ActionError> {
        let network = wallet.network().await;
        if let Some(message) = network_guard(&network, args.network.as_deref(), "transferring") {
            return Ok(message);
        }

        let to = parse_address("to", &args.to)?;
        let value = parse_ether(&args.value)?;
        if value.is_zero() {
            return Err(ActionError::InvalidArguments(
                "value must be greater than 0".to_string(),
            ));
        }

        let hash = wallet.native_transfer(to, value).await?;
        let outcome = wallet.wait_for_receipt(hash).await?;
        if !outcome.success {
            return Err(ActionError::TransactionFailed {
                action: "Transfer".to_string(),
                hash: hash.to_string(),
                status: outcome.status_label().to_string(),
            });
        }

        Ok(format!(
            "Successfully transferred {} ETH to {}. Transaction hash: {}",
            args.value, args.to, hash
        ))
    }

    async fn switch_network(
        &self,
        wallet: &dyn WalletProvider,
        args: SwitchNetworkArgs,
    ) -> Result<String, ActionError> {
        let current = wallet.network().await;
        let wanted = args.network_id.trim();
        if current.network_id.eq_ignore_ascii_case(wanted) {
            return Ok(format!(
                "Already on network {}, no need to switch.",
                current.network_id
            ));
        }

        let network = wallet.switch_network(wanted).await?;
        Ok(format!(
            "Successfully switched to network {} (Chain ID: {})",
            network.network_id, network.chain_id
        ))
    }

    async fn call_contract(
        &self,
        wallet: &dyn WalletProvider,
        args: CallContractArgs,
    ) -> Result<String, ActionError> {
        let network = wallet.network().await;
        if let Some(message) =
            network_guard(&network, args.network.as_deref(), "calling contract")
        {
            return Ok(message);
        }

        let contract = parse_address("contract_address", &args.contract_address)?;
        let abi = parse_abi(args.abi)?;
        let function = select_function(&abi, &args.function_name, args.inputs.as_ref())?;
        let values = encode_inputs(function, args.inputs.as_ref())?;
        let calldata: Bytes = function
            .abi_encode_input(&values)
            .map_err(|e| ActionError::InvalidArguments(format!("Failed to encode inputs: {}", e)))?
            .into();

        if matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            let data = wallet.read_contract(contract, calldata).await?;
            let decoded = function.abi_decode_output(&data).map_err(|e| {
                ActionError::Failed(format!("Failed to decode contract output: {}", e))
            })?;
            return Ok(format!("Contract call result: {}", format_outputs(&decoded)));
        }

        let value = match (function.state_mutability, input_value(args.inputs.as_ref())) {
            (StateMutability::Payable, Some(raw)) => parse_ether(&raw)?,
            _ => U256::ZERO,
        };

        let tx = TransactionRequest::default()
            .to(contract)
            .input(calldata.into())
            .value(value);
        let gas = TransactionSimulator::estimate_with_buffer(wallet, &tx, CALL_GAS_BUFFER_PERCENT)
            .await
            .map_err(|e| {
                ActionError::Failed(format!(
                    "Gas estimation failed: {}",
                    TransactionSimulator::parse_revert_reason(&e.to_string())
                ))
            })?;

        let hash = wallet.send_transaction(tx.gas_limit(gas)).await?;
        Ok(format!("Transaction sent: {}", hash))
    }
}

#[async_trait]
impl ActionProvider for WalletActionProvider {
    fn name(&self) -> &str {
        "wallet"
    }

    fn actions(&self) -> Vec<Action> {
        vec![
            Action::new::<GetWalletDetailsArgs>(
                "get_wallet_details",
                "Get the wallet address, provider, network and native balance.",
            ),
            Action::new::<GetBalanceArgs>(
                "get_balance",
                "Get the ETH balance of the wallet, or an ERC-20 balance when asset is a token address.",
            ),
            Action::new::<NativeTransferArgs>(
                "native_transfer",
                "Transfer native ETH to an address. value is in whole ETH, e.g. \"0.01\".",
            ),
            Action::new::<SwitchNetworkArgs>(
                "switch_network",
                "Switch the wallet to another network (base-sepolia, optimism-sepolia, ...).",
            ),
            Action::new::<CallContractArgs>(
                "call_contract",
                "Call any contract function given its ABI. View functions return the decoded result; other functions send a transaction.",
            ),
            Action::new::<SignMessageArgs>(
                "sign_message",
                "Sign a message with the wallet key (EIP-191). Returns the signature.",
            ),
        ]
    }

    fn supports_network(&self, network: &Network) -> bool {
        network.protocol_family == "evm"
    }

    async fn invoke(
        &self,
        action: &str,
        wallet: &dyn WalletProvider,
        args: Value,
    ) -> Result<String, ActionError> {
        match action {
            "get_wallet_details" => {
                let _: GetWalletDetailsArgs = parse_args(args)?;
                self.get_wallet_details(wallet).await
            }
            "get_balance" => self.get_balance(wallet, parse_args(args)?).await,
            "native_transfer" => self.native_transfer(wallet, parse_args(args)?).await,
            "switch_network" => self.switch_network(wallet, parse_args(args)?).await,
            "call_contract" => self.call_contract(wallet, parse_args(args)?).await,
            "sign_message" => {
                let args: SignMessageArgs = parse_args(args)?;
                let signature = wallet.sign_message(&args.message)?;
                Ok(format!("Signature: {}", signature))
            }
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}

/// Message telling the agent to switch first, when `requested` differs from the active network
fn network_guard(current: &Network, requested: Option<&str>, doing: &str) -> Option<String> {
    let requested = requested.map(str::trim).filter(|n| !n.is_empty())?;
    if requested.eq_ignore_ascii_case(&current.network_id) {
        return None;
    }
    Some(format!(
        "Please use the switch_network action to change to {} before {}.",
        requested, doing
    ))
}

async fn erc20_balance(wallet: &dyn WalletProvider, token: Address) -> crate::Result<String> {
    let owner = wallet.address();
    let raw = wallet
        .read_contract(token, IERC20::balanceOfCall { account: owner }.abi_encode().into())
        .await?;
    let balance = IERC20::balanceOfCall::abi_decode_returns(&raw)
        .map_err(|e| crate::Error::Rpc(format!("Bad balanceOf response: {}", e)))?;

    let raw = wallet
        .read_contract(token, IERC20::decimalsCall {}.abi_encode().into())
        .await?;
    let decimals = IERC20::decimalsCall::abi_decode_returns(&raw)
        .map_err(|e| crate::Error::Rpc(format!("Bad decimals response: {}", e)))?;

    Ok(format_units(balance, decimals as u32))
}

fn parse_abi(abi: Value) -> Result<JsonAbi, ActionError> {
    let invalid = |e: String| ActionError::InvalidArguments(format!("Invalid ABI: {}", e));

    let abi = match abi {
        Value::String(s) => serde_json::from_str(&s).map_err(|e| invalid(e.to_string()))?,
        other => other,
    };
    let items = match abi {
        Value::Array(_) => abi,
        Value::Object(mut map) => match map.remove("abi") {
            Some(inner) => inner,
            None => Value::Array(vec![Value::Object(map)]),
        },
        other => return Err(invalid(format!("expected array or object, got {}", other))),
    };
    serde_json::from_value(items).map_err(|e| invalid(e.to_string()))
}

/// Pick the overload whose arity matches the given inputs
fn select_function<'a>(
    abi: &'a JsonAbi,
    name: &str,
    inputs: Option<&Value>,
) -> Result<&'a Function, ActionError> {
    let overloads = abi
        .function(name)
        .filter(|fs| !fs.is_empty())
        .ok_or_else(|| {
            ActionError::InvalidArguments(format!("Function {} not found in ABI", name))
        })?;

    let arity = match inputs {
        Some(Value::Array(items)) => Some(items.len()),
        Some(Value::Object(map)) => Some(map.keys().filter(|k| k.as_str() != "value").count()),
        None | Some(Value::Null) => Some(0),
        _ => None,
    };
    Ok(arity
        .and_then(|n| overloads.iter().find(|f| f.inputs.len() == n))
        .unwrap_or(&overloads[0]))
}

fn encode_inputs(
    function: &Function,
    inputs: Option<&Value>,
) -> Result<Vec<DynSolValue>, ActionError> {
    let raw: Vec<&Value> = match inputs {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => function
            .inputs
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let key = field_key(param, i);
                map.get(&key).ok_or_else(|| {
                    ActionError::InvalidArguments(format!(
                        "Missing input {} for {}",
                        key, function.name
                    ))
                })
            })
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(ActionError::InvalidArguments(format!(
                "inputs must be an object or array, got {}",
                other
            )))
        }
    };

    if raw.len() != function.inputs.len() {
        return Err(ActionError::InvalidArguments(format!(
            "{} expects {} inputs, got {}",
            function.name,
            function.inputs.len(),
            raw.len()
        )));
    }

    function
        .inputs
        .iter()
        .zip(raw)
        .map(|(param, value)| {
            sol_value(&param.ty, &param.components, value).map_err(|e| {
                ActionError::InvalidArguments(format!(
                    "Invalid value for {} ({}): {}",
                    param.name, param.ty, e
                ))
            })
        })
        .collect()
}

/// Object key for a parameter; unnamed ones are addressed as `arg0`, `arg1`, ...
fn field_key(param: &Param, index: usize) -> String {
    if param.name.is_empty() {
        format!("arg{}", index)
    } else {
        param.name.clone()
    }
}

/// Build an ABI value of type `ty` from JSON. `components` are the tuple
/// fields of `ty` (or of its element type), matched to object keys by name.
fn sol_value(ty: &str, components: &[Param], value: &Value) -> Result<DynSolValue, String> {
    if let Some((element, size)) = split_array(ty) {
        let items = match structured(value) {
            Value::Array(items) => items,
            other => return Err(format!("expected an array for {}, got {}", ty, other)),
        };
        if let Some(n) = size.filter(|&n| n != items.len()) {
            return Err(format!("{} needs {} elements, got {}", ty, n, items.len()));
        }
        let values = items
            .iter()
            .map(|item| sol_value(element, components, item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(match size {
            Some(_) => DynSolValue::FixedArray(values),
            None => DynSolValue::Array(values),
        });
    }

    if ty == "tuple" {
        let fields = match structured(value) {
            Value::Object(map) => components
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let key = field_key(field, i);
                    let value = map.get(&key).ok_or_else(|| format!("missing field {}", key))?;
                    sol_value(&field.ty, &field.components, value)
                })
                .collect::<Result<Vec<_>, _>>()?,
            Value::Array(items) if items.len() == components.len() => components
                .iter()
                .zip(&items)
                .map(|(field, value)| sol_value(&field.ty, &field.components, value))
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(format!(
                    "expected an object or {}-element array, got {}",
                    components.len(),
                    other
                ))
            }
        };
        return Ok(DynSolValue::Tuple(fields));
    }

    let ty = DynSolType::parse(ty).map_err(|e| e.to_string())?;
    match (&ty, value) {
        (DynSolType::String, Value::String(s)) => Ok(DynSolValue::String(s.clone())),
        (_, Value::String(s)) => ty.coerce_str(s).map_err(|e| e.to_string()),
        (_, Value::Number(_) | Value::Bool(_)) => {
            ty.coerce_str(&value.to_string()).map_err(|e| e.to_string())
        }
        _ => Err(format!("expected {}, got {}", ty, value)),
    }
}

/// `T[]` and `T[N]` into the element type and fixed size
fn split_array(ty: &str) -> Option<(&str, Option<usize>)> {
    let open = ty.strip_suffix(']')?.rfind('[')?;
    let size = &ty[open + 1..ty.len() - 1];
    let size = match size {
        "" => None,
        n => Some(n.parse().ok()?),
    };
    Some((&ty[..open], size))
}

/// Arrays and structs sometimes arrive as JSON text
fn structured(value: &Value) -> Value {
    match value {
        Value::String(s) if s.trim_start().starts_with(['[', '{']) => {
            serde_json::from_str(s).unwrap_or_else(|_| value.clone())
        }
        other => other.clone(),
    }
}

fn input_value(inputs: Option<&Value>) -> Option<String> {
    match inputs?.get("value")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn format_outputs(values: &[DynSolValue]) -> String {
    match values {
        [] => "()".to_string(),
        [single] => format_value(single),
        many => format!(
            "({})",
            many.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(a) => a.to_checksum(None),
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Bytes(b) => alloy::hex::encode_prefixed(b),
        DynSolValue::FixedBytes(word, size) => alloy::hex::encode_prefixed(&word[..*size]),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => format!(
            "[{}]",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        DynSolValue::Tuple(items) => format!(
            "({})",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        other => format!("{:?}", other),
    }
}
