//! Governance interceptors around action calls
//!
//! Every action call passes through these before it touches the wallet.
//! They can block a call and they see every outcome.

mod audit_log;
mod policy;

use crate::actions::ActionError;
use async_trait::async_trait;
use serde_json::Value;

pub use audit_log::AuditLogInterceptor;
pub use policy::{PolicyConfig, PolicyInterceptor};

/// What an interceptor sees about a call
#[derive(Debug, Clone)]
pub struct ActionCallContext {
    pub call_id: uuid::Uuid,
    pub action: String,
    pub provider: String,
    pub network_id: String,
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptorDecision {
    Allow,
    Block(String),
}

#[async_trait]
pub trait ActionInterceptor: Send + Sync {
    /// Runs before the action; an error is treated as a block
    async fn before_action(
        &self,
        context: &ActionCallContext,
    ) -> crate::Result<InterceptorDecision>;

    async fn after_action(
        &self,
        context: &ActionCallContext,
        outcome: &Result<String, ActionError>,
        duration_ms: u64,
    );
}
