//! End-to-end tests of the HTTP surface against a temporary resources directory.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use heatmap_api::config::RouteConfig;
use heatmap_api::Environment;
use heatmap_api::{build_router, AppState, HeatmapConfig};
use storage::ObjectStorage;
use test_utils::{dust2_kill_records, ResourceFixture};

fn config_for(fixture: &ResourceFixture) -> HeatmapConfig {
    HeatmapConfig {
        resources_dir: fixture.root().to_path_buf(),
        ..Default::default()
    }
}

fn app_with(config: HeatmapConfig) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config).unwrap());
    (build_router(state.clone()), state)
}

async fn post_json(app: &Router, body: String) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/heatmap")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn dust2_body(is_accurate: bool) -> String {
    json!({
        "coordinates": dust2_kill_records(),
        "played_map": "dust2",
        "event": "kill",
        "isAccurate": is_accurate,
        "sigma": 16
    })
    .to_string()
}

#[tokio::test]
async fn test_smoothed_heatmap_created() {
    let fixture = ResourceFixture::new().with_map("dust2", 256, 256);
    let (app, state) = app_with(config_for(&fixture));

    let (status, body) = post_json(&app, dust2_body(false)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Heatmap created successfully");
    assert_eq!(body["heatmap"], "dust2-kill-heatmap.png");
    assert!(body.get("etag").is_none());

    let img = image::open(fixture.output_path("heatmaps", "dust2-kill-heatmap.png")).unwrap();
    assert_eq!(img.height(), 1023);
    assert!(img.width() > 1023);
    assert!(fixture.list_outputs("precisemaps").is_empty());

    let snap = state.metrics.snapshot().await;
    assert_eq!(snap.smoothed_renders, 1);
}

#[tokio::test]
async fn test_precise_heatmap_created() {
    let fixture = ResourceFixture::new().with_map("dust2", 600, 600);
    let (app, _) = app_with(config_for(&fixture));

    let (status, body) = post_json(&app, dust2_body(true)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["heatmap"], "dust2-kill-precise.png");

    let img = image::open(fixture.output_path("precisemaps", "dust2-kill-precise.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(img.height(), 600);
    // Both markers drawn over the checkerboard: (10, 20) at the top of the
    // scale, (500, 500) at the bottom
    assert_eq!(img.get_pixel(10, 20).0, renderer::jet(1.0).to_rgba());
    assert_eq!(img.get_pixel(500, 500).0, renderer::jet(0.0).to_rgba());
}

#[tokio::test]
async fn test_missing_coordinate_field_is_400() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let (app, _) = app_with(config_for(&fixture));

    let body = json!({"coordinates": [{"x": 1}], "played_map": "dust2", "event": "kill"});
    let (status, body) = post_json(&app, body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Invalid 'heatmap' value: "), "{}", detail);
    assert!(detail.contains(r#"{"x":1}"#), "{}", detail);
}

#[tokio::test]
async fn test_empty_coordinates_is_400() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let (app, state) = app_with(config_for(&fixture));

    let body = json!({"coordinates": [], "played_map": "dust2", "event": "kill"});
    let (status, _) = post_json(&app, body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.metrics.snapshot().await.rejected_requests, 1);
}

#[tokio::test]
async fn test_unparseable_body_is_400() {
    let fixture = ResourceFixture::new();
    let (app, _) = app_with(config_for(&fixture));

    let (status, body) = post_json(&app, "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid 'heatmap' value"));

    let (status, _) = post_json(&app, json!({"coordinates": []}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_negative_sigma_is_400() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let (app, _) = app_with(config_for(&fixture));

    let body = json!({
        "coordinates": dust2_kill_records(),
        "played_map": "dust2",
        "event": "kill",
        "sigma": -3
    });
    let (status, body) = post_json(&app, body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("sigma"));
}

#[tokio::test]
async fn test_oversized_sigma_is_400() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let mut config = config_for(&fixture);
    // 64 bins per axis caps sigma below the configured 128
    config.grid_bound = 65;
    let (app, state) = app_with(config);

    let body = json!({
        "coordinates": dust2_kill_records(),
        "played_map": "dust2",
        "event": "kill",
        "sigma": 4_000_000_000u64
    });
    let (status, body) = post_json(&app, body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("sigma") && detail.contains("at most 64"), "{}", detail);

    // Nothing was rendered or written
    assert_eq!(state.metrics.snapshot().await.renders_total, 0);
    assert!(fixture.list_outputs("heatmaps").is_empty());

    // The bound itself is still accepted
    let body = json!({
        "coordinates": dust2_kill_records(),
        "played_map": "dust2",
        "event": "kill",
        "sigma": 64
    });
    let (status, body) = post_json(&app, body.to_string()).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn test_whole_float_sigma_accepted() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let (app, _) = app_with(config_for(&fixture));

    let body = json!({
        "coordinates": dust2_kill_records(),
        "played_map": "dust2",
        "event": "kill",
        "sigma": 16.0
    });
    let (status, body) = post_json(&app, body.to_string()).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn test_path_traversal_is_400() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let (app, _) = app_with(config_for(&fixture));

    let body = json!({
        "coordinates": dust2_kill_records(),
        "played_map": "../maps/dust2",
        "event": "kill"
    });
    let (status, _) = post_json(&app, body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_map_is_404() {
    let fixture = ResourceFixture::new();
    let (app, _) = app_with(config_for(&fixture));

    let body = json!({
        "coordinates": dust2_kill_records(),
        "played_map": "nonexistent_map",
        "event": "kill"
    });
    let (status, body) = post_json(&app, body.to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Map not found: nonexistent_map");
    assert!(fixture.list_outputs("heatmaps").is_empty());
}

#[tokio::test]
async fn test_upload_returns_etag() {
    let fixture = ResourceFixture::new().with_map("dust2", 128, 128);
    let mut config = config_for(&fixture);
    config.upload.prefix = Some("renders".to_string());

    let storage = ObjectStorage::in_memory("heatmaps");
    let state = Arc::new(AppState::new(config).unwrap().with_storage(storage.clone()));
    let app = build_router(state.clone());

    let (status, body) = post_json(&app, dust2_body(true)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(!body["etag"].as_str().unwrap().is_empty());
    assert!(storage.exists("renders/dust2-kill-precise.png").await.unwrap());

    let snap = state.metrics.snapshot().await;
    assert_eq!(snap.uploads_total, 1);
    assert_eq!(snap.upload_errors, 0);
}

#[tokio::test]
async fn test_unique_filenames() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let mut config = config_for(&fixture);
    config.unique_filenames = true;
    let (app, _) = app_with(config);

    let (_, first) = post_json(&app, dust2_body(true)).await;
    let (_, second) = post_json(&app, dust2_body(true)).await;

    let first = first["heatmap"].as_str().unwrap().to_string();
    let second = second["heatmap"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(first.starts_with("dust2-kill-precise-") && first.ends_with(".png"));
    assert_eq!(fixture.list_outputs("precisemaps").len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_output() {
    let fixture = ResourceFixture::new().with_map("dust2", 128, 128);
    let (app, _) = app_with(config_for(&fixture));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { post_json(&app, dust2_body(false)).await })
        })
        .collect();

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK, "{}", body);
    }
    assert_eq!(
        fixture.list_outputs("heatmaps"),
        vec!["dust2-kill-heatmap.png".to_string()]
    );
    assert!(image::open(fixture.output_path("heatmaps", "dust2-kill-heatmap.png")).is_ok());
}

#[tokio::test]
async fn test_route_disabled() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let mut config = config_for(&fixture);
    config.routes = RouteConfig {
        heatmap: Some(false),
    };
    let (app, _) = app_with(config);

    let (status, _) = post_json(&app, dust2_body(false)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);
    let (app, _) = app_with(config_for(&fixture));
    post_json(&app, dust2_body(true)).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("heatmap_requests_total 1"), "{}", text);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let snap: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(snap["requests"], 1);
    assert_eq!(snap["precise_renders"], 1);
}

#[tokio::test]
async fn test_route_default_follows_environment() {
    let fixture = ResourceFixture::new().with_map("dust2", 64, 64);

    let mut config = config_for(&fixture);
    config.environment = Environment::Production;
    let (app, _) = app_with(config.clone());
    let (status, _) = post_json(&app, dust2_body(true)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    config.routes = RouteConfig {
        heatmap: Some(true),
    };
    let (app, _) = app_with(config);
    let (status, _) = post_json(&app, dust2_body(true)).await;
    assert_eq!(status, StatusCode::OK);
}
