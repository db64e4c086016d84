//! In-memory record of submitted instructions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task {task_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub chain_id: String,
    pub instruction: String,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Public view of a task as served over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: TaskStatus,
    pub chain_id: String,
    pub instruction: String,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl From<&TaskRecord> for TaskResult {
    fn from(record: &TaskRecord) -> Self {
        Self {
            task_id: record.task_id.clone(),
            status: record.status,
            chain_id: record.chain_id.clone(),
            instruction: record.instruction.clone(),
            result: record.result.clone(),
            error: record.error.clone(),
        }
    }
}

#[derive(Default)]
struct Inner {
    order: VecDeque<String>,
    records: HashMap<String, TaskRecord>,
}

pub struct TaskRegistry {
    counter: AtomicU64,
    max_tasks: usize,
    inner: RwLock<Inner>,
}

impl TaskRegistry {
    pub fn new(max_tasks: usize) -> Self {
        Self {
            counter: AtomicU64::new(0),
            max_tasks: max_tasks.max(1),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a pending task and return its record
    pub async fn create(&self, chain_id: u64, instruction: &str) -> TaskRecord {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let record = TaskRecord {
            task_id: format!("task-{}", n),
            status: TaskStatus::Pending,
            chain_id: chain_id.to_string(),
            instruction: instruction.to_string(),
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };

        let mut inner = self.inner.write().await;
        inner.order.push_back(record.task_id.clone());
        inner.records.insert(record.task_id.clone(), record.clone());
        self.evict(&mut inner);
        record
    }

    pub async fn complete(&self, task_id: &str, result: String) -> Result<(), TaskError> {
        self.finish(task_id, TaskStatus::Completed, Some(result), None)
            .await
    }

    pub async fn fail(&self, task_id: &str, error: String) -> Result<(), TaskError> {
        self.finish(task_id, TaskStatus::Failed, None, Some(error))
            .await
    }

    async fn finish(
        &self,
        task_id: &str,
        to: TaskStatus,
        result: Option<String>,
        error: Option<String>,
    ) -> Result<(), TaskError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .records
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;

        if record.status != TaskStatus::Pending {
            return Err(TaskError::InvalidTransition {
                task_id: task_id.to_string(),
                from: record.status,
                to,
            });
        }
        record.status = to;
        record.result = result;
        record.error = error;
        record.finished_at = Some(Utc::now());
        Ok(())
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.inner.read().await.records.get(task_id).cloned()
    }

    /// All tasks in creation order
    pub async fn list(&self) -> Vec<TaskRecord> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // Oldest finished tasks go first; pending ones are only dropped if
    // nothing finished is left to evict.
    fn evict(&self, inner: &mut Inner) {
        while inner.order.len() > self.max_tasks {
            let victim = inner
                .order
                .iter()
                .position(|id| {
                    inner
                        .records
                        .get(id)
                        .map(|r| r.status.is_finished())
                        .unwrap_or(true)
                })
                .unwrap_or(0);
            if let Some(id) = inner.order.remove(victim) {
                inner.records.remove(&id);
            }
        }
    }
}
