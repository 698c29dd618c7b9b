//! HTTP submission sink
//!
//! Delivers wizard payloads to the Podstudio REST API. One request per
//! submit; failures are reported to the wizard and never retried here.

use async_trait::async_trait;
use podstudio_forms::{ResourceId, SinkError, SubmissionSink, WizardContext};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::error::{codes, ErrorBody};
use crate::store::ResourceKind;

/// Configuration for [`HttpSink`]
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Server base URL, e.g. `http://localhost:5000`
    pub base_url: String,
    pub kind: ResourceKind,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Bearer token sent as `Authorization`
    pub auth_token: Option<String>,
}

impl HttpSinkConfig {
    pub fn new(base_url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            base_url: base_url.into(),
            kind,
            timeout_ms: 10_000,
            auth_token: None,
        }
    }

    /// Take the bearer token from a wizard's context
    pub fn with_context(mut self, context: &WizardContext) -> Self {
        self.auth_token = context.auth_token.clone();
        self
    }
}

/// [`SubmissionSink`] over the REST API
pub struct HttpSink {
    client: Client,
    config: HttpSinkConfig,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SinkError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/api/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.kind.collection()
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, target: &str) -> Result<ResourceId, SinkError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        tracing::debug!(kind = %self.config.kind, target, status = %status, "Submission response");

        if status.is_success() {
            return parse_created_id(response).await;
        }
        Err(map_failure(status, response, target).await)
    }
}

#[async_trait]
impl SubmissionSink for HttpSink {
    async fn create(&self, payload: Value) -> Result<ResourceId, SinkError> {
        let url = self.collection_url();
        self.send(self.client.post(&url).json(&payload), &url).await
    }

    async fn update(&self, id: &ResourceId, payload: Value) -> Result<ResourceId, SinkError> {
        let url = format!("{}/{}", self.collection_url(), id);
        self.send(self.client.put(&url).json(&payload), &url).await
    }
}

async fn parse_created_id(response: Response) -> Result<ResourceId, SinkError> {
    let body: Value = response
        .json()
        .await
        .map_err(|e| SinkError::Transport(format!("Failed to parse response: {}", e)))?;

    match body.get("id") {
        Some(Value::Number(n)) => Ok(ResourceId::new(n.to_string())),
        Some(Value::String(s)) => Ok(ResourceId::new(s.clone())),
        _ => Err(SinkError::Transport("Response did not carry an id".to_string())),
    }
}

async fn map_failure(status: StatusCode, response: Response, target: &str) -> SinkError {
    let text = response.text().await.unwrap_or_default();
    let body: Option<ErrorBody> = serde_json::from_str(&text).ok();

    if status == StatusCode::NOT_FOUND {
        return SinkError::NotFound(target.to_string());
    }

    match body {
        Some(body) if body.code == codes::DUPLICATE_EMAIL => SinkError::Duplicate(body.message),
        Some(body) => SinkError::Rejected {
            status: status.as_u16(),
            message: body.message,
        },
        None => {
            let message = text
                .lines()
                .next()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            SinkError::Rejected {
                status: status.as_u16(),
                message,
            }
        }
    }
}
