//! Policy enforcement interceptor for action calls.
//!
//! policy.json:
//! ```json
//! { "mode": "default-deny",
//!   "rules": [ { "action": "get_balance", "allowed": true } ] }
//! ```

use super::{ActionCallContext, ActionInterceptor, InterceptorDecision};
use crate::actions::ActionError;
use crate::config::{PolicyDefaultMode, PolicySettings};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyMode {
    AllowAll,
    DefaultDeny,
}

impl From<PolicyDefaultMode> for PolicyMode {
    fn from(mode: PolicyDefaultMode) -> Self {
        match mode {
            PolicyDefaultMode::AllowAll => PolicyMode::AllowAll,
            PolicyDefaultMode::DefaultDeny => PolicyMode::DefaultDeny,
        }
    }
}

#[derive(Debug, Clone)]
struct PolicyDecision {
    allowed: bool,
    rule_id: Option<String>,
    reason: String,
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    mode: PolicyMode,
    rules: HashMap<String, PolicyDecision>,
}

impl PolicyConfig {
    pub fn allow_all() -> Self {
        Self {
            mode: PolicyMode::AllowAll,
            rules: HashMap::new(),
        }
    }

    pub fn deny_all() -> Self {
        Self {
            mode: PolicyMode::DefaultDeny,
            rules: HashMap::new(),
        }
    }

    /// Load policy per settings; a missing file falls back to the default mode
    pub async fn load(settings: &PolicySettings) -> crate::Result<Self> {
        let path = settings
            .path
            .clone()
            .unwrap_or_else(|| "policy.json".into());

        if !path.exists() {
            if settings.require_file {
                return Err(crate::Error::Config(format!(
                    "Policy file {} is required but missing",
                    path.display()
                )));
            }
            return Ok(Self {
                mode: settings.default_mode.into(),
                rules: HashMap::new(),
            });
        }

        Self::load_file(&path).await
    }

    pub async fn load_file(path: &Path) -> crate::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
        let parsed: PolicyFile = serde_json::from_str(&contents)?;

        let mode = match parsed.mode.as_str() {
            "default-deny" => PolicyMode::DefaultDeny,
            "allow-all" => PolicyMode::AllowAll,
            other => {
                warn!(mode = other, "Unknown policy mode, defaulting to allow-all");
                PolicyMode::AllowAll
            }
        };

        let mut rules = HashMap::new();
        for rule in parsed.rules {
            if !is_valid_action_name(&rule.action) {
                warn!(
                    action = %rule.action,
                    "Invalid action name in policy.json; skipping rule"
                );
                continue;
            }

            rules.insert(
                rule.action,
                PolicyDecision {
                    allowed: rule.allowed,
                    rule_id: rule.rule_id,
                    reason: rule.reason.unwrap_or_else(|| "policy rule".to_string()),
                },
            );
        }

        info!(path = %path.display(), ?mode, rules = rules.len(), "Loaded action policy");
        Ok(Self { mode, rules })
    }

    fn decision_for_action(&self, action: &str) -> PolicyDecision {
        if let Some(decision) = self.rules.get(action) {
            return decision.clone();
        }

        match self.mode {
            PolicyMode::AllowAll => PolicyDecision {
                allowed: true,
                rule_id: None,
                reason: "allowed by default policy".to_string(),
            },
            PolicyMode::DefaultDeny => PolicyDecision {
                allowed: false,
                rule_id: None,
                reason: "denied by default policy".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicyInterceptor {
    policy: PolicyConfig,
}

impl PolicyInterceptor {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }
}

#[async_trait::async_trait]
impl ActionInterceptor for PolicyInterceptor {
    async fn before_action(
        &self,
        context: &ActionCallContext,
    ) -> crate::Result<InterceptorDecision> {
        let decision = self.policy.decision_for_action(&context.action);
        if decision.allowed {
            return Ok(InterceptorDecision::Allow);
        }

        let rule_id = decision
            .rule_id
            .as_ref()
            .map(|id| format!(" rule_id={}", id))
            .unwrap_or_default();
        Ok(InterceptorDecision::Block(format!(
            "Policy denied action {}: {}{}",
            context.action, decision.reason, rule_id
        )))
    }

    async fn after_action(
        &self,
        _context: &ActionCallContext,
        _outcome: &Result<String, ActionError>,
        _duration_ms: u64,
    ) {
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PolicyFile {
    mode: String,
    #[serde(default)]
    rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Deserialize)]
struct PolicyRule {
    action: String,
    allowed: bool,
    rule_id: Option<String>,
    reason: Option<String>,
}

fn is_valid_action_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    name.bytes()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(action: &str) -> ActionCallContext {
        ActionCallContext {
            call_id: uuid::Uuid::new_v4(),
            action: action.to_string(),
            provider: "wallet".to_string(),
            network_id: "base-sepolia".to_string(),
            args: json!({}),
        }
    }

    #[test]
    fn default_allow_policy_allows_unknown_actions() {
        let policy = PolicyConfig::allow_all();
        assert!(policy.decision_for_action("native_transfer").allowed);
    }

    #[test]
    fn default_deny_policy_blocks_unknown_actions() {
        let policy = PolicyConfig::deny_all();
        assert!(!policy.decision_for_action("native_transfer").allowed);
    }

    #[test]
    fn action_name_validation_rejects_invalid() {
        assert!(is_valid_action_name("crosschain_burn"));
        assert!(!is_valid_action_name("crosschain-burn"));
        assert!(!is_valid_action_name("Burn"));
        assert!(!is_valid_action_name(""));
    }

    #[tokio::test]
    async fn rules_from_file_override_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(
            &path,
            json!({
                "mode": "default-deny",
                "rules": [
                    { "action": "get_balance", "allowed": true },
                    { "action": "Bad-Name", "allowed": true },
                    { "action": "crosschain_mint", "allowed": false, "rule_id": "no-mint", "reason": "frozen" }
                ]
            })
            .to_string(),
        )
        .unwrap();

        let interceptor = PolicyInterceptor::new(PolicyConfig::load_file(&path).await.unwrap());
        assert_eq!(
            interceptor.before_action(&context("get_balance")).await.unwrap(),
            InterceptorDecision::Allow
        );
        assert_eq!(
            interceptor.before_action(&context("crosschain_mint")).await.unwrap(),
            InterceptorDecision::Block(
                "Policy denied action crosschain_mint: frozen rule_id=no-mint".to_string()
            )
        );
        assert!(matches!(
            interceptor.before_action(&context("native_transfer")).await.unwrap(),
            InterceptorDecision::Block(_)
        ));
    }

    #[tokio::test]
    async fn missing_file_uses_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = PolicySettings {
            default_mode: PolicyDefaultMode::DefaultDeny,
            require_file: false,
            path: Some(dir.path().join("policy.json")),
        };
        let policy = PolicyConfig::load(&settings).await.unwrap();
        assert_eq!(policy.mode, PolicyMode::DefaultDeny);

        settings.require_file = true;
        assert!(PolicyConfig::load(&settings).await.is_err());
    }
}
