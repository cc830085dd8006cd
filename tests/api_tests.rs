//! Integration tests for the read-only JSON API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use plant_monitor::config::ThresholdConfig;
use plant_monitor::domain::{ParameterName, ParameterReading};
use plant_monitor::error::SourceError;
use plant_monitor::server::{router, ApiState};
use plant_monitor::store::StateStore;

async fn get_json(state: ApiState, uri: &str) -> serde_json::Value {
    let response = router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("response should be json")
}

fn api_state(store: &StateStore) -> ApiState {
    ApiState { store: store.clone(), thresholds: Arc::new(ThresholdConfig::default()) }
}

#[tokio::test]
async fn dashboard_before_first_sample_is_loading() {
    let store = StateStore::new();
    let body = get_json(api_state(&store), "/api").await;

    assert_eq!(body["status"], "loading");
    let params = body["parameters"].as_array().unwrap();
    assert_eq!(params.len(), 3);
    assert!(params.iter().all(|p| p["value"].is_null() && p["alert"] == false));
}

#[tokio::test]
async fn dashboard_reports_values_and_alerts() {
    let store = StateStore::new();
    store
        .update([
            ParameterReading::new(ParameterName::Moisture, 85.0, 10),
            ParameterReading::new(ParameterName::Temperature, 30.0, 10),
            ParameterReading::new(ParameterName::Humidity, 60.0, 10),
        ])
        .await;

    let body = get_json(api_state(&store), "/api").await;
    assert_eq!(body["status"], "ready");

    let moisture = &body["parameters"][0];
    assert_eq!(moisture["name"], "moisture");
    assert_eq!(moisture["label"], "Soil Moisture");
    assert_eq!(moisture["value"], 85.0);
    assert_eq!(moisture["unit"], "%");
    assert_eq!(moisture["display_color"], "#2e7d32");
    assert_eq!(moisture["alert"], true);

    // exactly at threshold
    let temperature = &body["parameters"][1];
    assert_eq!(temperature["name"], "temperature");
    assert_eq!(temperature["alert"], false);
}

#[tokio::test]
async fn status_exposes_error_and_revision() {
    let store = StateStore::new();
    store.mark_error(&SourceError::Unavailable("no route to sensor".into())).await;

    let body = get_json(api_state(&store), "/api/status").await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["last_error"], "source unavailable: no route to sensor");
    assert_eq!(body["revision"], 1);
}

#[tokio::test]
async fn health_says_ok() {
    let response = router(api_state(&StateStore::new()))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
