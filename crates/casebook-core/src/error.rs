//! Error types for the case store, agent selection and the AI gateway.

use thiserror::Error;

/// Result type alias for core operations.
pub type CaseResult<T> = Result<T, CaseError>;

/// Errors raised by the store, the agent selector and the domain services.
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{collection} record not found: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("no agent profile offers capability '{0}'")]
    NoAgentForCapability(String),

    #[error("AI gateway: {0}")]
    Gateway(#[from] GatewayError),
}

impl CaseError {
    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }
}

/// Errors from the throttled AI gateway and its backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("backend request failed: {0}")]
    Request(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected backend response: {0}")]
    Response(String),

    #[error("backend not configured: {0}")]
    NotConfigured(String),

    #[error("call cancelled")]
    Cancelled,

    #[error("gateway queue closed")]
    QueueClosed,
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Request(e.to_string())
    }
}
