//! HTTP routes against an in-process router with a scripted dispatcher

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use skywire_agent::config::RouterConfig;
use skywire_agent::router::{
    InstructionDispatcher, ProcessState, ProcessStatus, RouterError, TaskStatus,
};
use skywire_agent::server::{router, AppState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

#[derive(Default)]
struct FakeDispatcher {
    calls: Mutex<Vec<(u64, String, Duration)>>,
}

#[async_trait]
impl InstructionDispatcher for FakeDispatcher {
    async fn execute(
        &self,
        chain_id: u64,
        instruction: &str,
        timeout: Duration,
    ) -> Result<String, RouterError> {
        self.calls
            .lock()
            .unwrap()
            .push((chain_id, instruction.to_string(), timeout));
        if instruction.contains("slow") {
            return Err(RouterError::Timeout {
                chain_id,
                secs: timeout.as_secs(),
            });
        }
        Ok(format!("done on {}", chain_id))
    }

    async fn agents_status(&self) -> Vec<ProcessStatus> {
        vec![ProcessStatus {
            chain_id: 84532,
            label: "base".to_string(),
            state: ProcessState::NotStarted,
            pid: None,
            restarts: 0,
            last_exit: None,
        }]
    }
}

fn app() -> (axum::Router, Arc<FakeDispatcher>) {
    let dispatcher = Arc::new(FakeDispatcher::default());
    let state = Arc::new(AppState::new(dispatcher.clone(), RouterConfig::default()));
    (router(state), dispatcher)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn post(body: Value) -> Request<Body> {
    Request::post("/instruction")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn wait_finished(app: &axum::Router, task_id: &str) -> Value {
    for _ in 0..100 {
        let (_, task) = send(app, get(&format!("/task/{}", task_id))).await;
        if task["status"] != "pending" {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never finished", task_id);
}

#[tokio::test]
async fn root_reports_running() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Dual Chain Agent API is running");
}

#[tokio::test]
async fn instruction_is_routed_by_keyword_and_completes() {
    let (app, dispatcher) = app();
    let (status, body) = send(&app, post(json!({"instruction": "bridge on optimism"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_id"], "task-1");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["chain_id"], "11155420");

    let task = wait_finished(&app, "task-1").await;
    assert_eq!(task["status"], "completed");
    assert_eq!(task["result"], "done on 11155420");
    assert!(task["error"].is_null());

    let calls = dispatcher.calls.lock().unwrap();
    assert_eq!(calls[0].2, Duration::from_secs(60));
}

#[tokio::test]
async fn explicit_chain_and_timeout_are_honoured() {
    let (app, dispatcher) = app();
    let (_, body) = send(
        &app,
        post(json!({"instruction": "check optimism", "chain_id": "84532", "timeout": 9999})),
    )
    .await;
    assert_eq!(body["chain_id"], "84532");

    wait_finished(&app, "task-1").await;
    let calls = dispatcher.calls.lock().unwrap();
    assert_eq!(calls[0].0, 84532);
    assert_eq!(calls[0].2, Duration::from_secs(600));
}

#[tokio::test]
async fn timeouts_fail_the_task() {
    let (app, _) = app();
    send(&app, post(json!({"instruction": "something slow"}))).await;

    let task = wait_finished(&app, "task-1").await;
    assert_eq!(task["status"], "failed");
    assert!(task["error"]
        .as_str()
        .unwrap()
        .starts_with("Timeout waiting for agent response"));
}

#[tokio::test]
async fn bad_requests_are_rejected() {
    let (app, dispatcher) = app();

    let (status, body) = send(&app, post(json!({"instruction": "x", "chain_id": "1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "Invalid chain_id: 1. Must be 84532 (Base) or 11155420 (Optimism)."
    );

    let (status, _) = send(&app, post(json!({"instruction": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, tasks) = send(&app, get("/tasks")).await;
    assert_eq!(tasks, json!([]));
    assert!(dispatcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_task_is_404() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/task/task-42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Task not found: task-42");
}

#[tokio::test]
async fn tasks_are_listed_in_creation_order() {
    let (app, _) = app();
    send(&app, post(json!({"instruction": "on base"}))).await;
    send(&app, post(json!({"instruction": "on op"}))).await;
    wait_finished(&app, "task-2").await;

    let (status, tasks) = send(&app, get("/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    let tasks: Vec<skywire_agent::router::TaskResult> = serde_json::from_value(tasks).unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].task_id, "task-1");
    assert_eq!(tasks[0].chain_id, "84532");
    assert_eq!(tasks[1].chain_id, "11155420");
    assert_ne!(tasks[1].status, TaskStatus::Pending);
}

#[tokio::test]
async fn agents_endpoint_reports_status() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/agents")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["state"], "not_started");
    assert_eq!(body[0]["chain_id"], 84532);
}
