//! HTTP API in front of the dual-agent router

mod error;

pub use error::ApiError;

use crate::config::RouterConfig;
use crate::router::{
    chain_name, resolve_chain, InstructionDispatcher, ProcessStatus, TaskRegistry, TaskResult,
    TaskStatus,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState {
    pub dispatcher: Arc<dyn InstructionDispatcher>,
    pub tasks: Arc<TaskRegistry>,
    pub settings: RouterConfig,
}

impl AppState {
    pub fn new(dispatcher: Arc<dyn InstructionDispatcher>, settings: RouterConfig) -> Self {
        Self {
            dispatcher,
            tasks: Arc::new(TaskRegistry::new(settings.max_tasks)),
            settings,
        }
    }

    fn clamp_timeout(&self, requested: Option<u64>) -> u64 {
        let max = self.settings.max_timeout_secs.max(1);
        requested
            .filter(|t| *t > 0)
            .unwrap_or(self.settings.default_timeout_secs)
            .clamp(1, max)
    }
}

#[derive(Debug, Deserialize)]
pub struct InstructionRequest {
    pub instruction: String,
    #[serde(default, deserialize_with = "de_chain_text")]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub chain_id: String,
    pub instruction: String,
}

// Chain ids arrive as "84532" or 84532
fn de_chain_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/instruction", post(submit_instruction))
        .route("/task/:task_id", get(get_task))
        .route("/tasks", get(list_tasks))
        .route("/agents", get(agents))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Dual Chain Agent API is running",
        "info": "Instructions are routed to the Base Sepolia agent (84532) or the Optimism Sepolia agent (11155420)"
    }))
}

async fn submit_instruction(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InstructionRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let instruction = body.instruction.trim().to_string();
    if instruction.is_empty() {
        return Err(ApiError::bad_request("Instruction must not be empty"));
    }
    let chain_id = resolve_chain(body.chain_id.as_deref(), &instruction)?;
    let timeout = state.clamp_timeout(body.timeout);

    let task = state.tasks.create(chain_id, &instruction).await;
    info!(task_id = %task.task_id, chain = chain_name(chain_id), timeout, "Task submitted");

    let dispatcher = state.dispatcher.clone();
    let tasks = state.tasks.clone();
    let task_id = task.task_id.clone();
    tokio::spawn(async move {
        let outcome = dispatcher
            .execute(chain_id, &instruction, Duration::from_secs(timeout))
            .await;
        let recorded = match outcome {
            Ok(result) => {
                info!(task_id = %task_id, "Task completed");
                tasks.complete(&task_id, result).await
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Task failed");
                tasks.fail(&task_id, e.to_string()).await
            }
        };
        if let Err(e) = recorded {
            warn!(task_id = %task_id, error = %e, "Could not record task outcome");
        }
    });

    Ok(Json(TaskResponse {
        task_id: task.task_id,
        status: task.status,
        chain_id: task.chain_id,
        instruction: task.instruction,
    }))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResult>, ApiError> {
    state
        .tasks
        .get(&task_id)
        .await
        .map(|record| Json(TaskResult::from(&record)))
        .ok_or_else(|| ApiError::not_found(format!("Task not found: {}", task_id)))
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<TaskResult>> {
    let tasks = state.tasks.list().await;
    Json(tasks.iter().map(TaskResult::from).collect())
}

async fn agents(State(state): State<Arc<AppState>>) -> Json<Vec<ProcessStatus>> {
    Json(state.dispatcher.agents_status().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouterError;
    use async_trait::async_trait;

    struct Idle;

    #[async_trait]
    impl InstructionDispatcher for Idle {
        async fn execute(&self, _: u64, _: &str, _: Duration) -> Result<String, RouterError> {
            Ok(String::new())
        }

        async fn agents_status(&self) -> Vec<ProcessStatus> {
            Vec::new()
        }
    }

    #[test]
    fn timeout_is_clamped() {
        let state = AppState::new(Arc::new(Idle), RouterConfig::default());
        assert_eq!(state.clamp_timeout(None), 60);
        assert_eq!(state.clamp_timeout(Some(0)), 60);
        assert_eq!(state.clamp_timeout(Some(5)), 5);
        assert_eq!(state.clamp_timeout(Some(100_000)), 600);
    }

    #[test]
    fn chain_id_accepts_numbers_and_strings() {
        let a: InstructionRequest =
            serde_json::from_str(r#"{"instruction":"x","chain_id":84532}"#).unwrap();
        let b: InstructionRequest =
            serde_json::from_str(r#"{"instruction":"x","chain_id":"11155420"}"#).unwrap();
        let c: InstructionRequest = serde_json::from_str(r#"{"instruction":"x"}"#).unwrap();
        assert_eq!(a.chain_id.as_deref(), Some("84532"));
        assert_eq!(b.chain_id.as_deref(), Some("11155420"));
        assert_eq!(c.chain_id, None);
        assert_eq!(c.timeout, None);
    }
}
