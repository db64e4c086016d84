//! Audit log interceptor
//!
//! Appends one JSON line per action start and completion.

use super::{ActionCallContext, ActionInterceptor, InterceptorDecision};
use crate::actions::ActionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RESULT_CHARS: usize = 1000;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    call_id: String,
    action: &'a str,
    provider: &'a str,
    network_id: &'a str,
    args: &'a Value,
    result: Option<String>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Interceptor that logs all action calls to a JSONL file
pub struct AuditLogInterceptor {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLogInterceptor {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter {
                path: log_path.into(),
            })),
        }
    }

    async fn record(&self, entry: AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

#[async_trait]
impl ActionInterceptor for AuditLogInterceptor {
    async fn before_action(
        &self,
        context: &ActionCallContext,
    ) -> crate::Result<InterceptorDecision> {
        self.record(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "action_call_start",
            call_id: context.call_id.to_string(),
            action: &context.action,
            provider: &context.provider,
            network_id: &context.network_id,
            args: &context.args,
            result: None,
            error: None,
            duration_ms: 0,
            status: "pending",
        })
        .await;

        // Audit logging never blocks
        Ok(InterceptorDecision::Allow)
    }

    async fn after_action(
        &self,
        context: &ActionCallContext,
        outcome: &Result<String, ActionError>,
        duration_ms: u64,
    ) {
        let (result, error, status) = match outcome {
            Ok(output) => (Some(truncate(output)), None, "success"),
            Err(ActionError::Blocked(reason)) => (None, Some(reason.clone()), "blocked"),
            Err(e) => (None, Some(e.to_string()), "error"),
        };

        self.record(AuditEntry {
            timestamp: Utc::now(),
            entry_type: "action_call_complete",
            call_id: context.call_id.to_string(),
            action: &context.action,
            provider: &context.provider,
            network_id: &context.network_id,
            args: &context.args,
            result,
            error,
            duration_ms,
            status,
        })
        .await;
    }
}

fn truncate(s: &str) -> String {
    match s.char_indices().nth(MAX_RESULT_CHARS) {
        Some((idx, _)) => format!("{}... [truncated]", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    fn context() -> ActionCallContext {
        ActionCallContext {
            call_id: uuid::Uuid::new_v4(),
            action: "crosschain_burn".to_string(),
            provider: "skywire".to_string(),
            network_id: "base-sepolia".to_string(),
            args: json!({ "amount": "1000", "from_address": "0xabc" }),
        }
    }

    #[tokio::test]
    async fn test_logs_action_call() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());
        let context = context();

        let decision = interceptor.before_action(&context).await.unwrap();
        assert_eq!(decision, InterceptorDecision::Allow);

        interceptor
            .after_action(&context, &Ok("Successfully burned".to_string()), 150)
            .await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["entry_type"], "action_call_start");
        assert_eq!(lines[1]["entry_type"], "action_call_complete");
        assert_eq!(lines[1]["status"], "success");
        assert_eq!(lines[1]["duration_ms"], 150);
        assert_eq!(lines[0]["call_id"], lines[1]["call_id"]);
    }

    #[tokio::test]
    async fn blocked_outcome_is_labelled() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());

        interceptor
            .after_action(
                &context(),
                &Err(ActionError::Blocked("denied".to_string())),
                0,
            )
            .await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("\"status\":\"blocked\""));
        assert!(content.contains("denied"));
    }

    #[test]
    fn long_results_are_truncated() {
        let long = "x".repeat(MAX_RESULT_CHARS + 10);
        let out = truncate(&long);
        assert!(out.ends_with("... [truncated]"));
        assert_eq!(truncate("short"), "short");
    }
}
