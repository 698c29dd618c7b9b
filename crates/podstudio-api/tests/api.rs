//! Integration tests for the Podstudio API and its submission sinks

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use podstudio_api::{
    build_app, create_router, ApiMetrics, AppState, HttpSink, HttpSinkConfig, ResourceKind,
    ServerConfig, Store, StoreSink,
};
use podstudio_forms::{
    catalog, FailureKind, Progress, ResourceId, SinkError, SubmissionOutcome, SubmissionSink,
    SubmitTarget, Wizard, WizardContext,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registration_body() -> Value {
    json!({
        "name": "Alex Rivera",
        "email": "alex@example.com",
        "businessName": "Rivera Media",
        "businessEmail": "hello@riveramedia.com",
        "businessDetails": "Independent podcast production studio",
        "businessType": "Entertainment",
        "targetAudience": "Small business owners and creators"
    })
}

fn podcast_body() -> Value {
    json!({
        "title": "Tech Talks Weekly",
        "description": "A weekly conversation about software, startups and the people who build them.",
        "categories": ["Technology", "Business"],
        "keywords": ["software", "startups"],
        "language": "English",
        "audienceType": "General",
        "speaker1": {
            "name": "Alex Rivera",
            "profileType": "image",
            "bio": "Host and producer of the show",
            "voice": "voice1",
            "accent": "US"
        },
        "videoStyle": "Static Image",
        "conversationMood": "Friendly"
    })
}

fn episode_body() -> Value {
    json!({
        "title": "Pilot Episode",
        "description": "Our first episode, introducing the hosts and what the show is about.",
        "keywords": ["intro"],
        "duration": "15 minutes",
        "voice1": "voice1",
        "voiceAccent": "US",
        "language": "English",
        "videoStyle": "Static Image",
        "conversationMood": "Friendly"
    })
}

fn state(store: Arc<Store>) -> AppState {
    AppState::new(store, Arc::new(ApiMetrics::new().unwrap())).unwrap()
}

fn fresh_app() -> Router {
    create_router(state(Arc::new(Store::new())))
}

async fn send(app: &Router, verb: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(verb).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn spawn_server(store: Arc<Store>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state(store));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn fill(wizard: &Wizard, values: &Value) {
    for (path, value) in values.as_object().unwrap() {
        wizard.set_field(path, value.clone());
    }
}

#[tokio::test]
async fn test_register_user() {
    let app = fresh_app();
    let (status, body) = send(&app, "POST", "/api/users", Some(registration_body())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], json!(1));
    assert_eq!(body["email"], "alex@example.com");
    assert!(body.get("businessWebsite").is_none());

    let (status, body) = send(&app, "GET", "/api/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["businessName"], "Rivera Media");
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = fresh_app();
    send(&app, "POST", "/api/users", Some(registration_body())).await;
    let (status, body) = send(&app, "POST", "/api/users", Some(registration_body())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already registered");
    assert_eq!(body["code"], "DUPLICATE_EMAIL");
}

#[tokio::test]
async fn test_invalid_body_lists_field_errors() {
    let app = fresh_app();
    let mut body = registration_body();
    body["name"] = json!("A");
    body["businessWebsite"] = json!("not a url");

    let (status, body) = send(&app, "POST", "/api/users", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["errors"]["name"], "Name must be at least 2 characters");
    assert_eq!(body["errors"]["businessWebsite"], "Invalid website URL");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = fresh_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/users")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&fresh_app(), "POST", "/api/users", Some(json!(["a"]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Request body must be a JSON object");
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = fresh_app();
    let (status, body) = send(&app, "GET", "/api/users/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(&app, "PUT", "/api/podcasts/missing", Some(podcast_body())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_of_unknown_user_is_not_found_before_email_check() {
    let app = fresh_app();
    let (status, _) = send(&app, "POST", "/api/users", Some(registration_body())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "PUT", "/api/users/99", Some(registration_body())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_update_of_unknown_user_reaches_wizard_as_not_found() {
    let store = Arc::new(Store::new());
    store
        .insert(ResourceKind::User, registration_body())
        .await
        .unwrap();
    let base_url = spawn_server(store).await;

    let sink = HttpSink::new(HttpSinkConfig::new(base_url, ResourceKind::User)).unwrap();
    let err = sink
        .update(&ResourceId::from(99u64), registration_body())
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::NotFound(_)));
}

#[tokio::test]
async fn test_podcast_list_and_delete() {
    let app = fresh_app();
    let mut ids = Vec::new();
    for title in ["Tech Talks Weekly", "Founders Hour"] {
        let mut body = podcast_body();
        body["title"] = json!(title);
        let (_, created) = send(&app, "POST", "/api/podcasts", Some(body)).await;
        ids.push(created["id"].as_str().unwrap().to_string());
    }

    let (status, listed) = send(&app, "GET", "/api/podcasts", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Tech Talks Weekly", "Founders Hour"]);

    let (status, _) = send(&app, "DELETE", &format!("/api/podcasts/{}", ids[0]), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/api/podcasts/{}", ids[0]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = send(&app, "GET", "/api/podcasts", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], json!(ids[1]));
}

#[tokio::test]
async fn test_episode_drafts_are_listed_by_status() {
    let app = fresh_app();
    for (title, status) in [
        ("Pilot Episode", "draft"),
        ("Launch Episode", "published"),
        ("Follow-up Episode", "draft"),
    ] {
        let mut body = episode_body();
        body["title"] = json!(title);
        body["status"] = json!(status);
        let (created, _) = send(&app, "POST", "/api/episodes", Some(body)).await;
        assert_eq!(created, StatusCode::CREATED);
    }

    let (status, drafts) = send(&app, "GET", "/api/episodes?status=draft", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = drafts
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Pilot Episode", "Follow-up Episode"]);

    let (_, all) = send(&app, "GET", "/api/episodes?limit=2", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/api/episodes?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = send(&app, "DELETE", "/api/episodes/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_podcast_create_then_update() {
    let app = fresh_app();
    let (status, created) = send(&app, "POST", "/api/podcasts", Some(podcast_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(created["speaker1"].get("social").is_none());
    assert!(created.get("speaker2").is_none());

    let mut update = podcast_body();
    update["title"] = json!("Tech Talks Daily");
    let (status, updated) = send(&app, "PUT", &format!("/api/podcasts/{}", id), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], json!(id));

    let (_, fetched) = send(&app, "GET", &format!("/api/podcasts/{}", id), None).await;
    assert_eq!(fetched["title"], "Tech Talks Daily");
}

#[tokio::test]
async fn test_started_optional_speaker_is_validated() {
    let app = fresh_app();
    let mut body = podcast_body();
    body["speaker2"] = json!({"name": "Maria Chen"});

    let (status, body) = send(&app, "POST", "/api/podcasts", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["speaker2.bio"], "Bio must be at least 10 characters");
    assert_eq!(body["errors"]["speaker2.accent"], "Please select speaker accent");
}

#[tokio::test]
async fn test_health_and_request_id() {
    let app = fresh_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["forms"], 3);
    assert_eq!(body["components"]["records"]["users"], 0);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let app = fresh_app();
    send(&app, "POST", "/api/users", Some(registration_body())).await;
    let (status, body) = send(&app, "GET", "/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("podstudio_http_requests_total"));
    assert!(text.contains(
        "podstudio_submissions_total{form=\"registration\",operation=\"create\",result=\"success\"} 1"
    ));

    let disabled = create_router(state(Arc::new(Store::new())).with_metrics_enabled(false));
    let (status, _) = send(&disabled, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let config = ServerConfig {
        max_body_size: 64,
        ..Default::default()
    };
    let app = build_app(state(Arc::new(Store::new())), &config);
    let body = registration_body().to_string();

    let request = Request::builder()
        .method("POST")
        .uri("/api/users")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_oversized_body_without_length_is_refused() {
    let config = ServerConfig {
        max_body_size: 64,
        ..Default::default()
    };
    let app = build_app(state(Arc::new(Store::new())), &config);

    let request = Request::builder()
        .method("POST")
        .uri("/api/users")
        .header("content-type", "application/json")
        .body(Body::from(registration_body().to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_missing_json_content_type_is_unsupported() {
    let app = fresh_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/users")
        .body(Body::from(registration_body().to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_registration_wizard_over_store_sink() {
    let store = Arc::new(Store::new());
    let sink = Arc::new(StoreSink::new(store.clone(), ResourceKind::User));
    let wizard =
        Wizard::initialize(catalog::registration(), None, WizardContext::create(), sink).unwrap();
    fill(&wizard, &registration_body());

    wizard.proceed().await;
    wizard.proceed().await;
    let progress = wizard.proceed().await;

    assert_eq!(
        progress,
        Progress::Submitted(SubmissionOutcome::Success {
            resource_id: ResourceId::from(1u64)
        })
    );
    let record = store.get(ResourceKind::User, "1").await.unwrap();
    assert!(record.data.get("businessWebsite").is_none());
}

#[tokio::test]
async fn test_same_email_twice_over_http() {
    let base_url = spawn_server(Arc::new(Store::new())).await;

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let context = WizardContext::create();
        let sink = HttpSink::new(
            HttpSinkConfig::new(base_url.clone(), ResourceKind::User).with_context(&context),
        )
        .unwrap();
        let wizard =
            Wizard::initialize(catalog::registration(), None, context, Arc::new(sink)).unwrap();
        fill(&wizard, &registration_body());
        outcomes.push(wizard.submit(SubmitTarget::Create).await);
    }

    assert_eq!(
        outcomes[0],
        SubmissionOutcome::Success {
            resource_id: ResourceId::from(1u64)
        }
    );
    match &outcomes[1] {
        SubmissionOutcome::Failure { kind, message, .. } => {
            assert_eq!(*kind, FailureKind::SinkError);
            assert_eq!(message, "Email already registered");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_podcast_wizard_updates_over_http() {
    let store = Arc::new(Store::new());
    let existing = store
        .insert(ResourceKind::Podcast, podcast_body())
        .await
        .unwrap();
    let base_url = spawn_server(store.clone()).await;

    let context = WizardContext::update(existing.id.clone());
    let sink = HttpSink::new(HttpSinkConfig::new(base_url, ResourceKind::Podcast)).unwrap();
    let wizard =
        Wizard::initialize(catalog::podcast(), Some(&existing.data), context, Arc::new(sink))
            .unwrap();
    wizard.set_field("title", json!("Tech Talks Daily"));

    let outcome = wizard.submit(SubmitTarget::Update(existing.id.clone())).await;
    assert_eq!(
        outcome,
        SubmissionOutcome::Success {
            resource_id: existing.id.clone()
        }
    );
    let record = store
        .get(ResourceKind::Podcast, existing.id.as_str())
        .await
        .unwrap();
    assert_eq!(record.data["title"], "Tech Talks Daily");
}

#[tokio::test]
async fn test_http_sink_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7, "name": "Alex"})))
        .expect(1)
        .mount(&server)
        .await;

    let context = WizardContext::create().with_auth_token("token-123");
    let sink = HttpSink::new(HttpSinkConfig::new(server.uri(), ResourceKind::User).with_context(&context))
        .unwrap();

    let id = sink.create(registration_body()).await.unwrap();
    assert_eq!(id, ResourceId::from(7u64));
}

#[tokio::test]
async fn test_http_sink_maps_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Email already registered",
            "code": "DUPLICATE_EMAIL"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/episodes"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/podcasts/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "podcast 'gone' not found",
            "code": "NOT_FOUND"
        })))
        .mount(&server)
        .await;

    let users = HttpSink::new(HttpSinkConfig::new(server.uri(), ResourceKind::User)).unwrap();
    assert_eq!(
        users.create(registration_body()).await.unwrap_err(),
        SinkError::Duplicate("Email already registered".to_string())
    );

    let episodes = HttpSink::new(HttpSinkConfig::new(server.uri(), ResourceKind::Episode)).unwrap();
    assert_eq!(
        episodes.create(json!({})).await.unwrap_err(),
        SinkError::Rejected {
            status: 500,
            message: "database unavailable".to_string()
        }
    );

    let podcasts = HttpSink::new(HttpSinkConfig::new(server.uri(), ResourceKind::Podcast)).unwrap();
    let err = podcasts
        .update(&ResourceId::from("gone"), podcast_body())
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::NotFound(_)));
}

#[tokio::test]
async fn test_http_sink_transport_error() {
    let mut config = HttpSinkConfig::new("http://127.0.0.1:1", ResourceKind::User);
    config.timeout_ms = 500;
    let sink = HttpSink::new(config).unwrap();

    let err = sink.create(registration_body()).await.unwrap_err();
    assert!(matches!(err, SinkError::Transport(_)));
    assert!(err.user_message().starts_with("Could not reach the server"));
}
