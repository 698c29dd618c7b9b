//! Route definitions
//!
//! - POST /api/users, GET|PUT /api/users/:id
//! - GET|POST /api/podcasts, GET|PUT|DELETE /api/podcasts/:id
//! - GET|POST /api/episodes, GET|PUT|DELETE /api/episodes/:id
//! - GET /health
//! - GET /metrics
//!
//! Request bodies are validated against the same catalog schemas the form
//! wizards use, so a payload the wizard accepts is accepted here.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use podstudio_forms::{
    FieldSelection, FormDefinition, FormError, FormState, SchemaValidator, Validator,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::metrics::ApiMetrics;
use crate::middleware::request_logging_middleware;
use crate::store::{ListQuery, ResourceKind, Store};

/// State shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub metrics: Arc<ApiMetrics>,
    pub forms: Arc<HashMap<ResourceKind, FormDefinition>>,
    pub metrics_enabled: bool,
    pub start_time: Instant,
}

impl AppState {
    /// Build the state, checking every served form's wiring up front
    pub fn new(store: Arc<Store>, metrics: Arc<ApiMetrics>) -> Result<Self, FormError> {
        let mut forms = HashMap::new();
        for kind in ResourceKind::ALL {
            let definition = kind.definition();
            definition.validate()?;
            forms.insert(kind, definition);
        }

        Ok(Self {
            store,
            metrics,
            forms: Arc::new(forms),
            metrics_enabled: true,
            start_time: Instant::now(),
        })
    }

    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Validate a request body against `kind`'s schema and reduce it to schema fields
    fn validated_payload(
        &self,
        kind: ResourceKind,
        body: Result<Json<Value>, JsonRejection>,
    ) -> Result<Value, ApiError> {
        let Json(body) = body?;
        if !body.is_object() {
            return Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            ));
        }

        let definition = self
            .forms
            .get(&kind)
            .ok_or_else(|| ApiError::Internal(format!("No form registered for {}", kind)))?;
        let state = FormState::with_initial(Arc::clone(&definition.schema), &body)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let result =
            SchemaValidator.validate(&definition.schema, &FieldSelection::All, state.as_value());
        if !result.valid {
            tracing::debug!(
                form = kind.form_id(),
                error_count = result.errors.len(),
                "Request body failed validation"
            );
            self.metrics
                .record_validation_failures(kind.form_id(), &result.errors);
            return Err(ApiError::ValidationFailed(result.errors));
        }

        Ok(state.payload())
    }
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/:id", get(get_user).put(update_user))
        .route("/api/podcasts", get(list_podcasts).post(create_podcast))
        .route(
            "/api/podcasts/:id",
            get(get_podcast).put(update_podcast).delete(delete_podcast),
        )
        .route("/api/episodes", get(list_episodes).post(create_episode))
        .route(
            "/api/episodes/:id",
            get(get_episode).put(update_episode).delete(delete_episode),
        )
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_logging_middleware,
        ))
        .with_state(state)
}

/// Router with the transport limits from `config` applied
pub fn build_app(state: AppState, config: &ServerConfig) -> Router {
    let router = create_router(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(TimeoutLayer::new(config.request_timeout()));

    if config.cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn create_resource(
    state: &AppState,
    kind: ResourceKind,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let outcome = async move {
        let payload = state.validated_payload(kind, body)?;
        let record = state.store.insert(kind, payload).await?;
        tracing::info!(kind = %kind, id = %record.id, "Record created");
        Ok::<_, ApiError>(record.to_json())
    }
    .await;

    state
        .metrics
        .record_submission(kind.form_id(), "create", result_label(&outcome));
    outcome.map(|body| (StatusCode::CREATED, Json(body)))
}

async fn update_resource(
    state: &AppState,
    kind: ResourceKind,
    id: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let outcome = async move {
        let payload = state.validated_payload(kind, body)?;
        let record = state.store.replace(kind, id, payload).await?;
        tracing::info!(kind = %kind, id = %record.id, "Record updated");
        Ok::<_, ApiError>(record.to_json())
    }
    .await;

    state
        .metrics
        .record_submission(kind.form_id(), "update", result_label(&outcome));
    outcome.map(Json)
}

async fn read_resource(state: &AppState, kind: ResourceKind, id: &str) -> Result<Json<Value>, ApiError> {
    let record = state.store.get(kind, id).await?;
    Ok(Json(record.to_json()))
}

async fn list_resources(
    state: &AppState,
    kind: ResourceKind,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let records = state.store.list(kind, &params.into_query()?).await;
    Ok(Json(records.iter().map(|r| r.to_json()).collect()))
}

async fn delete_resource(state: &AppState, kind: ResourceKind, id: &str) -> Result<StatusCode, ApiError> {
    state.store.remove(kind, id).await?;
    tracing::info!(kind = %kind, id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn result_label<T>(outcome: &Result<T, ApiError>) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(ApiError::ValidationFailed(_)) => "invalid",
        Err(ApiError::DuplicateEmail) => "duplicate",
        Err(ApiError::NotFound(_)) => "not_found",
        Err(_) => "error",
    }
}

/// POST /api/users - Register a user
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create_resource(&state, ResourceKind::User, body).await
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    read_resource(&state, ResourceKind::User, &id).await
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    update_resource(&state, ResourceKind::User, &id, body).await
}

/// POST /api/podcasts
pub async fn create_podcast(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create_resource(&state, ResourceKind::Podcast, body).await
}

/// Query string of the list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl ListParams {
    fn into_query(self) -> Result<ListQuery, ApiError> {
        let limit = self.limit.unwrap_or(ListQuery::MAX_LIMIT);
        if limit == 0 || limit > ListQuery::MAX_LIMIT {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {}",
                ListQuery::MAX_LIMIT
            )));
        }
        Ok(ListQuery {
            status: self.status.filter(|s| !s.is_empty()),
            skip: self.skip.unwrap_or(0),
            limit,
        })
    }
}

/// GET /api/podcasts
pub async fn list_podcasts(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    list_resources(&state, ResourceKind::Podcast, params).await
}

/// GET /api/podcasts/:id
pub async fn get_podcast(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    read_resource(&state, ResourceKind::Podcast, &id).await
}

/// PUT /api/podcasts/:id
pub async fn update_podcast(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    update_resource(&state, ResourceKind::Podcast, &id, body).await
}

/// DELETE /api/podcasts/:id
pub async fn delete_podcast(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_resource(&state, ResourceKind::Podcast, &id).await
}

/// GET /api/episodes - `?status=draft` lists drafts
pub async fn list_episodes(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    list_resources(&state, ResourceKind::Episode, params).await
}

/// POST /api/episodes
pub async fn create_episode(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create_resource(&state, ResourceKind::Episode, body).await
}

/// GET /api/episodes/:id
pub async fn get_episode(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    read_resource(&state, ResourceKind::Episode, &id).await
}

/// PUT /api/episodes/:id
pub async fn update_episode(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    update_resource(&state, ResourceKind::Episode, &id, body).await
}

/// DELETE /api/episodes/:id
pub async fn delete_episode(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_resource(&state, ResourceKind::Episode, &id).await
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: ComponentHealth,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub store: bool,
    pub forms: usize,
    pub metrics: bool,
    /// Record count per collection
    pub records: BTreeMap<String, usize>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut records = BTreeMap::new();
    for kind in ResourceKind::ALL {
        records.insert(kind.collection().to_string(), state.store.count(kind).await);
    }

    Json(HealthResponse {
        status: "healthy".to_string(),
        components: ComponentHealth {
            store: true,
            forms: state.forms.len(),
            metrics: state.metrics_enabled,
            records,
        },
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    if !state.metrics_enabled {
        return Err(ApiError::NotFound("Metrics are disabled".to_string()));
    }
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {}", e)))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
