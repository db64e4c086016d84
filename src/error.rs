//! Error types for the Skywire agent toolkit

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Interceptor blocked: {0}")]
    Blocked(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("LLM error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    #[error("Router error: {0}")]
    Router(#[from] crate::router::RouterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
