//! The HTTP surface, driven with `oneshot` against the router.

mod common;

use atlas_daemon::api::{ErrorBody, SubmitResponse, CONTENT_ID_HEADER};
use atlas_daemon::OpenedSnapshot;
use atlas_types::IdempotencyKey;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::Engine;
use common::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn error_code(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body).unwrap().error.code
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let node = node();
    let app = node.router();
    let body = json!({
        "id": "us-ny",
        "kind": { "level": "state", "code": "NY" }
    });

    let (status, _, bytes) = send(&app, post_json("/v1/jurisdictions", body.clone(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&bytes), "UNAUTHORIZED");

    let (status, _, _) = send(&app, post_json("/v1/jurisdictions", body.clone(), Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, bytes) = send(&app, post_json("/v1/jurisdictions", body.clone(), Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(created["id"], "us-ny");

    let (status, _, bytes) = send(&app, post_json("/v1/jurisdictions", body, Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&bytes), "ALREADY_EXISTS");

    let (status, _, _) = send(&app, get("/v1/jurisdictions/us-ny")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let node = node();
    let app = node.router();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/submissions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _, bytes) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
    assert!(!body.error.retryable);
}

#[tokio::test]
async fn test_submit_created_replayed_and_duplicate() {
    let node = node();
    let member = populate(&node).await;
    let app = node.router();

    let (status, _, bytes) = send(&app, get("/v1/atlas/paths/us-ca-cd12/7")).await;
    assert_eq!(status, StatusCode::OK);
    let path: atlas_types::InclusionPath = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(path.leaf_index, 7);

    let proof = prove(&member, &path, "petition-42", 9);
    let key = IdempotencyKey::new();
    let body = |key: IdempotencyKey| {
        json!({
            "proof": proof.proof_base64().unwrap(),
            "public_inputs": proof.public_inputs,
            "idempotency_key": key,
            "payload": "I support petition 42",
        })
    };

    let (status, _, bytes) = send(&app, post_json("/v1/submissions", body(key), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: SubmitResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(!created.replayed);

    let (status, _, bytes) = send(&app, post_json("/v1/submissions", body(key), None)).await;
    assert_eq!(status, StatusCode::OK);
    let replayed: SubmitResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(replayed.replayed);
    assert_eq!(replayed.submission_id, created.submission_id);

    let (status, _, bytes) = send(&app, post_json("/v1/submissions", body(IdempotencyKey::new()), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&bytes), "DUPLICATE_ACTION");
    let conflict: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(conflict["code"], "DUPLICATE_ACTION");

    let uri = format!("/v1/submissions/{}", created.submission_id);
    let (status, _, bytes) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let row: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(row["status"], "pending");
}

#[tokio::test]
async fn test_invalid_proof_encoding_is_rejected() {
    let node = node();
    let member = populate(&node).await;
    let path = current_path(&node).await;
    let proof = prove(&member, &path, "petition-42", 9);
    let app = node.router();

    let short = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
    let body = json!({
        "proof": short,
        "public_inputs": proof.public_inputs,
        "payload": "x",
    });
    let (status, _, bytes) = send(&app, post_json("/v1/submissions", body, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&bytes), "INVALID_PROOF");
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "INVALID_PROOF");
    assert_eq!(node.storage().submission_count(), 0);

    let stats = node.pipeline().stats();
    assert_eq!(stats.invalid_proofs, 1);
    assert_eq!(stats.received, 1);
}

#[tokio::test]
async fn test_snapshot_is_content_addressed() {
    let node = node();
    populate(&node).await;
    let app = node.router();

    let (status, headers, bytes) = send(&app, get("/v1/atlas/snapshot")).await;
    assert_eq!(status, StatusCode::OK);
    let content_id = headers.get(CONTENT_ID_HEADER).unwrap().to_str().unwrap().to_string();

    let snapshot = OpenedSnapshot::open(&bytes, Some(&content_id)).unwrap();
    assert_eq!(snapshot.global_root(), node.atlas().head().global_root);
    let offline = snapshot.inclusion_path(&district(), 7).unwrap();
    assert_eq!(offline, current_path(&node).await);
}

#[tokio::test]
async fn test_root_and_metrics_endpoints() {
    let node = node();
    populate(&node).await;
    let app = node.router();

    let (status, _, bytes) = send(&app, get("/v1/atlas/root")).await;
    assert_eq!(status, StatusCode::OK);
    let root: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(root["total_leaves"], 8);
    assert_eq!(root["district_depth"], 4);

    let (status, _, bytes) = send(&app, get("/v1/atlas/history?limit=3")).await;
    assert_eq!(status, StatusCode::OK);
    let history: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(history["roots"].as_array().unwrap().len(), 3);

    let (status, _, bytes) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("atlas_leaves 8"));
}
