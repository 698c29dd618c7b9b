//! Submission sink contract
//!
//! The sink is the downstream collaborator that stores a validated payload.
//! Implementations decide delivery guarantees; the engine calls a sink at
//! most once per submit attempt and never retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Identifier of a stored resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Failures reported by a sink
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// A uniqueness constraint rejected the payload (e.g. email already registered)
    #[error("Duplicate resource: {0}")]
    Duplicate(String),

    /// The server refused the payload
    #[error("Rejected by server (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The resource to update does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Network or protocol failure before the server answered
    #[error("Transport error: {0}")]
    Transport(String),
}

impl SinkError {
    /// Message suitable for a banner next to the form
    pub fn user_message(&self) -> String {
        match self {
            SinkError::Duplicate(message) | SinkError::Rejected { message, .. } => message.clone(),
            SinkError::NotFound(_) => "The record you are editing no longer exists".to_string(),
            SinkError::Transport(_) => {
                "Could not reach the server. Please check your connection and try again"
                    .to_string()
            }
        }
    }
}

/// Downstream create/update contract
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Insert a new resource
    async fn create(&self, payload: Value) -> Result<ResourceId, SinkError>;

    /// Replace the resource `id` with `payload`
    async fn update(&self, id: &ResourceId, payload: Value) -> Result<ResourceId, SinkError>;
}
