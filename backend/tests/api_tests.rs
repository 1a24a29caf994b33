//! HTTP API tests
//!
//! Drives the router with `tower::ServiceExt::oneshot` over the in-memory store

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use roast_backend::middleware::Claims;
use roast_backend::store::MemoryRoastStore;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{reference_payload, test_state, JWT_SECRET};

fn app() -> Router {
    roast_backend::create_app(test_state(Arc::new(MemoryRoastStore::new())))
}

fn bearer(user_id: Uuid) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: now,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

fn request(method: Method, uri: &str, user: Option<Uuid>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let response = app()
        .oneshot(request(Method::GET, "/api/v1/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_import_requires_token() {
    let response = app()
        .oneshot(request(
            Method::POST,
            "/api/v1/roasts/import",
            None,
            Some(reference_payload()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_import_then_fetch_profile() {
    let app = app();
    let user = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/roasts/import",
            Some(user),
            Some(reference_payload()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let report = json_body(response).await;
    assert_eq!(report["log_rows"], 7);
    assert_eq!(report["phase_rows"], 3);
    let roast_id = report["roast_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/roasts/{}", roast_id),
            Some(user),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = json_body(response).await;
    assert_eq!(profile["title"], "Ethiopia Guji");
    assert_eq!(profile["temperature_unit"], "F");
    assert_eq!(profile["derived"]["milestones"]["fc_start"], 90.0);

    // Someone else's roast looks absent
    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/roasts/{}", roast_id),
            Some(Uuid::new_v4()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_payload_names_field() {
    let mut payload = reference_payload();
    payload["mode"] = json!("K");

    let response = app()
        .oneshot(request(
            Method::POST,
            "/api/v1/roasts/import",
            Some(Uuid::new_v4()),
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
    assert_eq!(body["error"]["field"], "mode");
}

#[tokio::test]
async fn test_reimport_and_clear() {
    let app = app();
    let user = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/roasts/import",
            Some(user),
            Some(reference_payload()),
        ))
        .await
        .unwrap();
    let roast_id = json_body(response).await["roast_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/v1/roasts/{}/import", roast_id),
            Some(user),
            Some(reference_payload()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/roasts/{}/data", roast_id),
            Some(user),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/roasts/{}", roast_id),
            Some(user),
            None,
        ))
        .await
        .unwrap();
    let profile = json_body(response).await;
    assert!(profile["derived"].is_null());
    assert!(!profile["data_cleared_at"].is_null());
}
