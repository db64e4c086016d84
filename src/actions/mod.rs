//! Agent-callable actions
//!
//! An [`ActionProvider`] groups related actions, each with a JSON schema for
//! its arguments. The [`ActionRegistry`] exposes them to the LLM as function
//! tools and runs every call through the interceptor pipeline. Failures are
//! rendered as text so the agent can read and react to them.

pub mod skywire;
pub mod wallet;

use crate::amount::AmountError;
use crate::interceptors::{ActionCallContext, ActionInterceptor, InterceptorDecision};
use crate::network::Network;
use crate::wallet::WalletProvider;
use alloy::primitives::Address;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use skywire::SkywireActionProvider;
pub use wallet::WalletActionProvider;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("Chain ID {0} is not supported")]
    UnsupportedChain(u64),

    #[error("Failed to switch to network {network} (Chain ID: {chain_id}). Please switch manually and try again.")]
    SwitchFailed { network: String, chain_id: u64 },

    #[error("{0}")]
    Precondition(String),

    #[error("{action} transaction failed. Transaction hash: {hash}. Status: {status}")]
    TransactionFailed {
        action: String,
        hash: String,
        status: String,
    },

    #[error("{0}")]
    Failed(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("{0}")]
    Blocked(String),

    #[error(transparent)]
    Wallet(#[from] crate::Error),
}

/// A single callable action and its argument schema
#[derive(Debug, Clone)]
pub struct Action {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
}

impl Action {
    pub fn new<Args: JsonSchema>(name: &'static str, description: &'static str) -> Self {
        let mut schema: Value = schemars::schema_for!(Args).into();
        if let Value::Object(map) = &mut schema {
            map.remove("$schema");
            map.remove("title");
            map.entry("properties").or_insert_with(|| json!({}));
        }
        Self {
            name,
            description,
            schema,
        }
    }

    /// OpenAI function-tool definition
    pub fn tool_spec(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.schema,
            }
        })
    }
}

#[async_trait]
pub trait ActionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn actions(&self) -> Vec<Action>;

    fn supports_network(&self, network: &Network) -> bool;

    async fn invoke(
        &self,
        action: &str,
        wallet: &dyn WalletProvider,
        args: Value,
    ) -> Result<String, ActionError>;
}

/// Deserialize tool arguments into their typed form
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ActionError> {
    let args = match args {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| ActionError::InvalidArguments(e.to_string()))
}

pub(crate) fn parse_address(field: &str, raw: &str) -> Result<Address, ActionError> {
    Address::from_str(raw.trim()).map_err(|_| {
        ActionError::InvalidArguments(format!("{} is not a valid address: {}", field, raw))
    })
}

/// Accept `"0.1"` or `0.1` for amount fields; models emit both
pub(crate) fn de_amount<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected amount as string or number, got {}",
            other
        ))),
    }
}

/// Accept `84532`, `"84532"` or null for optional chain id fields
pub(crate) fn de_chain_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid chain id {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid chain id {}", s))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid chain id {}",
            other
        ))),
    }
}

/// The set of providers and interceptors an agent runs with
pub struct ActionRegistry {
    wallet: Arc<dyn WalletProvider>,
    providers: Vec<Arc<dyn ActionProvider>>,
    interceptors: Vec<Arc<dyn ActionInterceptor>>,
}

impl ActionRegistry {
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        Self {
            wallet,
            providers: Vec::new(),
            interceptors: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: impl ActionProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn ActionInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn wallet(&self) -> &Arc<dyn WalletProvider> {
        &self.wallet
    }

    /// Actions available on the wallet's current network, with their provider
    pub async fn actions(&self) -> Vec<(Arc<dyn ActionProvider>, Action)> {
        let network = self.wallet.network().await;
        self.providers
            .iter()
            .filter(|p| p.supports_network(&network))
            .flat_map(|p| p.actions().into_iter().map(move |a| (Arc::clone(p), a)))
            .collect()
    }

    pub async fn tool_specs(&self) -> Vec<Value> {
        self.actions()
            .await
            .iter()
            .map(|(_, action)| action.tool_spec())
            .collect()
    }

    /// Run one action call; always yields text for the model
    pub async fn invoke(&self, name: &str, args: Value) -> String {
        match self.try_invoke(name, args).await {
            Ok(output) => output,
            Err(ActionError::Blocked(reason)) => format!("Blocked: {}", reason),
            Err(e) => format!("Error: {}", e),
        }
    }

    pub async fn try_invoke(&self, name: &str, args: Value) -> Result<String, ActionError> {
        let provider = self
            .actions()
            .await
            .into_iter()
            .find(|(_, action)| action.name == name)
            .map(|(provider, _)| provider)
            .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;

        let context = ActionCallContext {
            call_id: uuid::Uuid::new_v4(),
            action: name.to_string(),
            provider: provider.name().to_string(),
            network_id: self.wallet.network().await.network_id,
            args,
        };

        for interceptor in &self.interceptors {
            let decision = interceptor.before_action(&context).await.unwrap_or_else(|e| {
                warn!(error = %e, action = name, "Interceptor failed, blocking call");
                InterceptorDecision::Block(format!("interceptor error: {}", e))
            });
            if let InterceptorDecision::Block(reason) = decision {
                info!(action = name, %reason, "Action blocked");
                let outcome = Err(ActionError::Blocked(reason.clone()));
                self.after(&context, &outcome, 0).await;
                return outcome;
            }
        }

        debug!(action = name, provider = %context.provider, "Invoking action");
        let start = Instant::now();
        let outcome = provider
            .invoke(name, self.wallet.as_ref(), context.args.clone())
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => info!(action = name, duration_ms, "Action completed"),
            Err(e) => warn!(action = name, duration_ms, error = %e, "Action failed"),
        }
        self.after(&context, &outcome, duration_ms).await;
        outcome
    }

    async fn after(
        &self,
        context: &ActionCallContext,
        outcome: &Result<String, ActionError>,
        duration_ms: u64,
    ) {
        for interceptor in &self.interceptors {
            interceptor.after_action(context, outcome, duration_ms).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::wallet::mock::MockWallet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoArgs {
        text: String,
    }

    struct EchoProvider;

    #[async_trait]
    impl ActionProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn actions(&self) -> Vec<Action> {
            vec![Action::new::<EchoArgs>("echo", "Echo text back")]
        }

        fn supports_network(&self, network: &Network) -> bool {
            network.chain_id == 84532
        }

        async fn invoke(
            &self,
            _action: &str,
            _wallet: &dyn WalletProvider,
            args: Value,
        ) -> Result<String, ActionError> {
            let args: EchoArgs = parse_args(args)?;
            Ok(args.text)
        }
    }

    struct Counting {
        before: AtomicUsize,
        after: AtomicUsize,
        block: bool,
    }

    #[async_trait]
    impl ActionInterceptor for Counting {
        async fn before_action(
            &self,
            _context: &ActionCallContext,
        ) -> crate::Result<InterceptorDecision> {
            self.before.fetch_add(1, Ordering::SeqCst);
            Ok(if self.block {
                InterceptorDecision::Block("no echo today".to_string())
            } else {
                InterceptorDecision::Allow
            })
        }

        async fn after_action(
            &self,
            _context: &ActionCallContext,
            _outcome: &Result<String, ActionError>,
            _duration_ms: u64,
        ) {
            self.after.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn registry(block: bool) -> (ActionRegistry, Arc<Counting>) {
        let wallet = Arc::new(MockWallet::new(Address::ZERO, Network::base_sepolia()));
        let counting = Arc::new(Counting {
            before: AtomicUsize::new(0),
            after: AtomicUsize::new(0),
            block,
        });
        let registry = ActionRegistry::new(wallet)
            .with_provider(EchoProvider)
            .with_interceptor(counting.clone());
        (registry, counting)
    }

    #[tokio::test]
    async fn invokes_through_interceptors() {
        let (registry, counting) = registry(false);
        let out = registry.invoke("echo", json!({"text": "hi"})).await;
        assert_eq!(out, "hi");
        assert_eq!(counting.before.load(Ordering::SeqCst), 1);
        assert_eq!(counting.after.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blocked_calls_are_reported_not_run() {
        let (registry, counting) = registry(true);
        let out = registry.invoke("echo", json!({"text": "hi"})).await;
        assert_eq!(out, "Blocked: no echo today");
        assert_eq!(counting.after.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_become_text() {
        let (registry, _) = registry(false);
        assert_eq!(
            registry.invoke("nope", json!({})).await,
            "Error: Unknown action: nope"
        );
        let out = registry.invoke("echo", json!({})).await;
        assert!(out.starts_with("Error: Invalid arguments:"), "{out}");
    }

    #[tokio::test]
    async fn tool_specs_follow_current_network() {
        let (registry, _) = registry(false);
        let specs = registry.tool_specs().await;
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0]["function"]["name"], "echo");
        assert_eq!(specs[0]["function"]["parameters"]["type"], "object");
        assert!(specs[0]["function"]["parameters"]["properties"]["text"].is_object());

        registry
            .wallet()
            .switch_network("optimism-sepolia")
            .await
            .unwrap();
        assert!(registry.tool_specs().await.is_empty());
    }

    #[test]
    fn lenient_field_parsers() {
        #[derive(Deserialize)]
        struct Args {
            #[serde(deserialize_with = "de_amount")]
            amount: String,
            #[serde(default, deserialize_with = "de_chain_id")]
            chain_id: Option<u64>,
        }

        let a: Args = serde_json::from_value(json!({"amount": 0.5, "chain_id": "84532"})).unwrap();
        assert_eq!(a.amount, "0.5");
        assert_eq!(a.chain_id, Some(84532));

        let b: Args = serde_json::from_value(json!({"amount": "10"})).unwrap();
        assert_eq!(b.chain_id, None);

        assert!(serde_json::from_value::<Args>(json!({"amount": true})).is_err());
    }

    #[test]
    fn addresses_are_trimmed_and_named_in_errors() {
        let parsed = parse_address("to", " 0x3333333333333333333333333333333333333333 ").unwrap();
        assert_eq!(parsed, Address::repeat_byte(0x33));

        let err = parse_address("from_address", "0x12").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments: from_address is not a valid address: 0x12"
        );
    }
}
