//! Client for the dual-agent HTTP API

use crate::router::{TaskResult, TaskStatus};
use crate::server::TaskResponse;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Timeout waiting for task {task_id} to complete after {secs} seconds")]
    WaitTimeout { task_id: String, secs: u64 },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn submit_instruction(
        &self,
        instruction: &str,
        chain_id: Option<&str>,
        timeout_secs: u64,
    ) -> Result<TaskResponse, ClientError> {
        let mut body = json!({
            "instruction": instruction,
            "timeout": timeout_secs,
        });
        if let Some(chain_id) = chain_id {
            body["chain_id"] = json!(chain_id);
        }
        let response = self
            .http
            .post(format!("{}/instruction", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<TaskResult, ClientError> {
        let response = self
            .http
            .get(format!("{}/task/{}", self.base_url, task_id))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskResult>, ClientError> {
        let response = self
            .http
            .get(format!("{}/tasks", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Poll until the task leaves `pending`. `on_wait` sees every pending poll.
    pub async fn wait_for_completion<F>(
        &self,
        task_id: &str,
        poll_interval: Duration,
        max_wait: Duration,
        mut on_wait: F,
    ) -> Result<TaskResult, ClientError>
    where
        F: FnMut(&TaskResult),
    {
        let started = Instant::now();
        loop {
            let task = self.get_task(task_id).await?;
            if task.status != TaskStatus::Pending {
                return Ok(task);
            }
            if started.elapsed() > max_wait {
                return Err(ClientError::WaitTimeout {
                    task_id: task_id.to_string(),
                    secs: max_wait.as_secs(),
                });
            }
            on_wait(&task);
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "API error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
