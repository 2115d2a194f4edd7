//! Handler tests over the in-memory stores, with the planning model served
//! by wiremock.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reelgen_api::{create_router, ApiConfig, AppState, OWNER_HEADER};
use reelgen_models::{CameraMove, Plan, Scene, Shot, Transition};
use reelgen_orchestrator::{HttpAdapterFactory, Orchestrator, OrchestratorConfig};
use reelgen_providers::{Capability, MemoryCredentialStore, ProviderCredentials};
use reelgen_scheduler::Scheduler;
use reelgen_store::MemoryStore;

const OWNER: &str = "owner-1";

fn test_app() -> (Router, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryStore::new());
    let credentials = Arc::new(MemoryCredentialStore::new());
    let (scheduler, wakeups) = Scheduler::new();
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        store.clone(),
        credentials.clone(),
        Arc::new(HttpAdapterFactory),
        scheduler,
        OrchestratorConfig::default(),
    ));
    orchestrator.clone().spawn(wakeups);

    let state = AppState::new(
        ApiConfig::default(),
        store.clone(),
        store,
        credentials.clone(),
        orchestrator,
    );
    (create_router(state), credentials)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    owner: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(OWNER_HEADER, owner);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn create_project(app: &Router, owner: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/projects",
        Some(owner),
        Some(json!({
            "name": "promo",
            "concept": "A drone ascent over a pine forest at dawn",
            "target_duration": 30.0,
            "aspect_ratio": "16:9",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    body["data"]["id"].as_str().unwrap().to_string()
}

fn prompt() -> String {
    vec!["detail"; 21].join(" ")
}

fn planner_plan(durations: &[f64]) -> Plan {
    Plan {
        title: "Dawn Ascent".into(),
        narrative: "a drone rises over a pine forest".into(),
        total_duration: durations.iter().sum(),
        scenes: vec![Scene {
            id: 1,
            name: "ascent".into(),
            description: "over the trees".into(),
            mood: "serene".into(),
            shots: durations
                .iter()
                .enumerate()
                .map(|(i, d)| Shot {
                    id: i as u32 + 1,
                    duration: *d,
                    start_prompt: prompt(),
                    end_prompt: prompt(),
                    motion_prompt: prompt(),
                    camera_move: CameraMove::CraneUp,
                    lighting: "golden dawn light".into(),
                    color_palette: None,
                    transition_out: Transition::Cut,
                })
                .collect(),
        }],
    }
}

async fn mount_planner(server: &MockServer, content: String) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": content}}],
            "usage": {"prompt_tokens": 1500, "completion_tokens": 2100},
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn missing_owner_header_is_unauthorized() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "POST", "/api/projects", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("owner"));
}

#[tokio::test]
async fn create_and_fetch_project() {
    let (app, _) = test_app();
    let project_id = create_project(&app, OWNER).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{}", project_id),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("draft"));
    assert_eq!(body["data"]["target_duration"], json!(30.0));
}

#[tokio::test]
async fn other_owner_cannot_see_project() {
    let (app, _) = test_app();
    let project_id = create_project(&app, OWNER).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{}", project_id),
        Some("owner-2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn invalid_create_requests_are_rejected() {
    let (app, _) = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/projects",
        Some(OWNER),
        Some(json!({"name": "", "concept": "c", "target_duration": 30.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/projects",
        Some(OWNER),
        Some(json!({"name": "n", "concept": "c", "target_duration": 2.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown provider tags fail at creation time, not at phase entry.
    let (status, body) = send(
        &app,
        "POST",
        "/api/projects",
        Some(OWNER),
        Some(json!({
            "name": "n",
            "concept": "c",
            "target_duration": 30.0,
            "providers": {"video": "openrouter"},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn direct_without_text_credentials_is_unauthorized() {
    let (app, _) = test_app();
    let project_id = create_project(&app, OWNER).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/direct", project_id),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("text"));
}

#[tokio::test]
async fn direct_produces_plan_and_cost_estimate() {
    let (app, credentials) = test_app();
    let server = MockServer::start().await;
    mount_planner(
        &server,
        serde_json::to_string(&planner_plan(&[7.5, 7.5, 7.5, 7.5])).unwrap(),
    )
    .await;

    credentials
        .insert(
            OWNER,
            Capability::Text,
            ProviderCredentials::new("k").with_endpoint(format!("{}/v1", server.uri())),
        )
        .await;
    for cap in [Capability::Image, Capability::Video] {
        credentials
            .insert(OWNER, cap, ProviderCredentials::new("k"))
            .await;
    }

    let project_id = create_project(&app, OWNER).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/direct", project_id),
        Some(OWNER),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let plan = &body["data"]["plan"];
    assert_eq!(plan["total_duration"], json!(30.0));
    assert_eq!(plan["scenes"][0]["shots"].as_array().unwrap().len(), 4);

    let estimate = &body["data"]["cost_estimate"];
    assert_eq!(estimate["image_count"], json!(8));
    assert_eq!(estimate["video_count"], json!(4));
    assert!(estimate["total_usd"].as_f64().unwrap() > 0.0);

    // The plan landed on the project and approval now works.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/approve", project_id),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn direct_surfaces_validation_location() {
    let (app, credentials) = test_app();
    let server = MockServer::start().await;

    // zoom_through is not a camera move the validator accepts.
    let bad_plan = serde_json::to_string(&planner_plan(&[7.5, 7.5, 7.5, 7.5]))
        .unwrap()
        .replace("crane_up", "zoom_through");
    mount_planner(&server, bad_plan).await;

    credentials
        .insert(
            OWNER,
            Capability::Text,
            ProviderCredentials::new("k").with_endpoint(format!("{}/v1", server.uri())),
        )
        .await;

    let project_id = create_project(&app, OWNER).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/direct", project_id),
        Some(OWNER),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("scene 1 shot 1"));
    assert!(message.contains("zoom_through"));
}

#[tokio::test]
async fn approve_without_plan_is_rejected() {
    let (app, _) = test_app();
    let project_id = create_project(&app, OWNER).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/approve", project_id),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no plan"));
}

#[tokio::test]
async fn generate_requires_approval() {
    let (app, _) = test_app();
    let project_id = create_project(&app, OWNER).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/generate", project_id),
        Some(OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/api/jobs/nope", Some(OWNER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn health_endpoint() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
