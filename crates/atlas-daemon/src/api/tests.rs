use super::*;
use atlas_types::AtlasError;
use axum::http::StatusCode;
use axum::response::IntoResponse;

async fn render(error: ApiError) -> (StatusCode, ErrorBody) {
    let response = error.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_duplicate_action_is_conflict() {
    let (status, body) = render(AtlasError::DuplicateAction("0x0102".into()).into()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body.code, "DUPLICATE_ACTION");
    assert_eq!(body.error.code, "DUPLICATE_ACTION");
    assert!(!body.error.retryable);
}

#[tokio::test]
async fn test_unknown_root_uses_stale_root_code() {
    let (status, body) = render(AtlasError::UnknownRoot("0xab".into()).into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.code, "STALE_ROOT");
    assert_eq!(body.error.code, "STALE_ROOT");
}

#[tokio::test]
async fn test_transient_errors_are_retryable() {
    let (status, body) = render(AtlasError::Timeout("submission insert".into()).into()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.error.retryable);
}

#[tokio::test]
async fn test_internal_details_are_hidden() {
    let (status, body) = render(AtlasError::Serialization("bincode: tag 7 at offset 91".into()).into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.error.message.contains("offset"));
}

#[tokio::test]
async fn test_auth_and_rate_limit_errors() {
    let (status, body) = render(ApiError::Unauthorized("Missing bearer token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.error.code, "UNAUTHORIZED");

    let (status, body) = render(ApiError::RateLimited).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body.error.retryable);
}
