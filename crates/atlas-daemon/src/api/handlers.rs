use atlas_crypto::decode_proof_base64;
use atlas_types::{AtlasError, InclusionPath, Jurisdiction, JurisdictionId, SubmissionId};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, ETAG};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::error::{ApiError, ApiResult};
use super::responses::*;
use super::state::AppState;
use crate::atlas::Registration;
use crate::metrics::PipelineStats;
use crate::services::{SubmissionOutcome, SubmissionRequest};
use crate::storage::StorageMetricsSnapshot;

pub const CONTENT_ID_HEADER: HeaderName = HeaderName::from_static("x-content-id");
pub const ATLAS_VERSION_HEADER: HeaderName = HeaderName::from_static("x-atlas-version");

const DEFAULT_HISTORY_LIMIT: usize = 16;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        atlas_version: state.atlas.head().version,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn define_jurisdiction(
    State(state): State<AppState>,
    body: Result<Json<DefineJurisdictionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Jurisdiction>)> {
    let Json(request) = body?;
    let jurisdiction = state
        .atlas
        .define_jurisdiction(request.id, request.kind, request.parent)
        .await?;
    Ok((StatusCode::CREATED, Json(jurisdiction)))
}

pub async fn get_jurisdiction(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Jurisdiction>> {
    let Path(id) = id?;
    let id = JurisdictionId::new(id)?;
    Ok(Json(state.atlas.jurisdiction(&id)?))
}

pub async fn register_commitment(
    State(state): State<AppState>,
    body: Result<Json<RegisterCommitmentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    let Json(request) = body?;
    let registration = state
        .atlas
        .register_commitment(&request.jurisdictions, request.commitment)
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn atlas_root(State(state): State<AppState>) -> Json<RootResponse> {
    let view = state.atlas.view();
    let params = state.atlas.params();
    Json(RootResponse {
        global_root: view.head.global_root,
        atlas_version: view.head.version,
        published_at: view.head.published_at,
        district_depth: params.district_depth,
        global_depth: params.global_depth,
        jurisdictions: view.jurisdictions.len(),
        total_leaves: view.total_leaves,
        vk_hash: state.pipeline.verifier_fingerprint().to_string(),
    })
}

pub async fn root_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<RootHistoryResponse>> {
    let Query(query) = query?;
    let history = state.atlas.history();
    let config = history.config();
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(config.max_versions.max(1));
    Ok(Json(RootHistoryResponse {
        max_versions: config.max_versions,
        max_age_secs: config.max_age_secs,
        roots: history.recent(limit),
    }))
}

pub async fn inclusion_path(
    State(state): State<AppState>,
    params: Result<Path<(String, u64)>, PathRejection>,
) -> ApiResult<Json<InclusionPath>> {
    let Path((jurisdiction, leaf_index)) = params?;
    let jurisdiction = JurisdictionId::new(jurisdiction)?;
    Ok(Json(state.atlas.inclusion_path(&jurisdiction, leaf_index).await?))
}

pub async fn snapshot(State(state): State<AppState>) -> ApiResult<Response> {
    let encoded = state.atlas.export_snapshot().await?;
    let content_id = header_value(&encoded.content_id)?;
    let etag = header_value(&format!("\"{}\"", encoded.content_id))?;
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_ID_HEADER, content_id),
            (ETAG, etag),
            (ATLAS_VERSION_HEADER, HeaderValue::from(encoded.atlas_version)),
        ],
        encoded.bytes.clone(),
    )
        .into_response())
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ApiError::Atlas(AtlasError::Internal(e.to_string())))
}

pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(request) = body?;
    let proof = decode_proof_base64(&request.proof).map_err(|e| state.pipeline.reject(e))?;
    let outcome = state
        .pipeline
        .submit(SubmissionRequest {
            proof,
            public_inputs: request.public_inputs,
            idempotency_key: request.idempotency_key,
            payload: request.payload,
        })
        .await?;

    let status = match outcome {
        SubmissionOutcome::Created(_) => StatusCode::CREATED,
        SubmissionOutcome::Replayed(_) => StatusCode::OK,
    };
    let submission = outcome.submission();
    Ok((
        status,
        Json(SubmitResponse {
            submission_id: submission.id,
            status: submission.status,
            replayed: outcome.is_replay(),
        }),
    ))
}

pub async fn get_submission(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<SubmissionResponse>> {
    let Path(id) = id?;
    let submission = state.pipeline.get_submission(SubmissionId::parse(&id)?).await?;
    Ok(Json(submission.into()))
}

pub async fn advance_status(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<AdvanceStatusRequest>, JsonRejection>,
) -> ApiResult<Json<SubmissionResponse>> {
    let Path(id) = id?;
    let Json(request) = body?;
    let submission = state
        .pipeline
        .advance_status(SubmissionId::parse(&id)?, request.status)
        .await?;
    Ok(Json(submission.into()))
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub pipeline: PipelineStats,
    pub storage: StorageMetricsSnapshot,
    pub tracked_clients: usize,
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        pipeline: state.pipeline.stats(),
        storage: state.atlas.storage_metrics().snapshot(),
        tracked_clients: state.rate_limiter.stats().tracked_ips,
    })
}

pub async fn prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.atlas.view();
    let body = state
        .exporter
        .export(&view.head, view.jurisdictions.len(), view.total_leaves);
    (
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4"))],
        body,
    )
}
