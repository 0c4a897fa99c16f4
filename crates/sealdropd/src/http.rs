//! Share API
//!
//! ```text
//! POST /share?expires_at=<rfc3339>&max_downloads=<n>[&password_hash=<hex>][&filename=<name>]
//!      body: ciphertext                          -> 200 {"id": "..."}
//! GET  /share/{id}[?password_hash=<hex>]         -> 200 ciphertext
//!                                                   404 / 410 / 401 {"error": "..."}
//! ```
//!
//! The server never parses, inspects, or can decrypt the payload body — it
//! is ciphertext end to end. The decryption secret lives in the share
//! link's URL fragment, which by HTTP construction never appears in any
//! request handled here.

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use sealdrop_core::types::{DenyReason, SharePolicy};
use sealdrop_crypto::PasswordDigest;
use sealdrop_share::{download, upload, DownloadBody, DownloadOutcome, LifecycleGate, RecordStore};

use crate::metrics::AppMetrics;

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<RecordStore>,
    pub op: opendal::Operator,
    pub gate: Arc<LifecycleGate>,
    pub metrics: Arc<AppMetrics>,
}

pub fn router(state: AppState, max_payload_bytes: usize) -> Router {
    Router::new()
        .route("/share", post(create_share))
        .route("/share/{id}", get(fetch_share))
        .layer(DefaultBodyLimit::max(max_payload_bytes))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateParams {
    expires_at: String,
    max_downloads: u32,
    password_hash: Option<String>,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    password_hash: Option<String>,
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn create_share(
    State(state): State<AppState>,
    Query(params): Query<CreateParams>,
    body: Bytes,
) -> Response {
    let policy = match validate_policy(&params) {
        Ok(policy) => policy,
        Err(message) => return error_body(StatusCode::BAD_REQUEST, &message),
    };

    if body.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "empty payload");
    }

    let original_name = params.filename.unwrap_or_else(|| "file".into());

    match upload(
        &state.op,
        &state.records,
        body.to_vec(),
        original_name,
        policy,
    )
    .await
    {
        Ok(id) => {
            state.metrics.shares_created.inc();
            (StatusCode::OK, Json(json!({ "id": id }))).into_response()
        }
        Err(e) => {
            tracing::error!("upload failed: {e}");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "upload failed")
        }
    }
}

fn validate_policy(params: &CreateParams) -> Result<SharePolicy, String> {
    let expires_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&params.expires_at)
        .map_err(|e| format!("invalid expires_at: {e}"))?
        .with_timezone(&Utc);

    if params.max_downloads == 0 {
        return Err("max_downloads must be at least 1".into());
    }

    // Normalize the digest to lowercase hex; reject garbage up front so a
    // bad upload fails loudly instead of creating an unopenable share.
    let password_hash = match &params.password_hash {
        None => None,
        Some(hex) => Some(
            PasswordDigest::from_hex(hex)
                .map_err(|e| format!("invalid password_hash: {e}"))?
                .to_hex(),
        ),
    };

    Ok(SharePolicy {
        expires_at,
        max_downloads: params.max_downloads,
        password_hash,
    })
}

async fn fetch_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<FetchParams>,
) -> Response {
    let outcome = match download(&state.gate, &id, params.password_hash.as_deref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(share = %id, "download failed: {e}");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, "download failed");
        }
    };

    match outcome {
        DownloadOutcome::Denied(reason) => {
            state.metrics.record_denial(reason);
            if reason == DenyReason::Expired || reason == DenyReason::Exhausted {
                state.metrics.purged.inc();
            }
            match reason {
                DenyReason::NotFound => error_body(StatusCode::NOT_FOUND, "file not found"),
                DenyReason::Expired => error_body(StatusCode::GONE, "link expired"),
                DenyReason::Exhausted => error_body(StatusCode::GONE, "download limit reached"),
                DenyReason::BadPassword => {
                    error_body(StatusCode::UNAUTHORIZED, "password required or incorrect")
                }
            }
        }
        DownloadOutcome::Ready(dl) => {
            state.metrics.record_grant();

            let disposition = format!(
                "attachment; filename=\"{}\"",
                sanitize_filename(&dl.original_name)
            );
            let body = match dl.body {
                DownloadBody::Buffered(bytes) => {
                    // this was the exhausting download: the share is purged
                    state.metrics.purged.inc();
                    Body::from(bytes)
                }
                DownloadBody::Streamed(stream) => Body::from_stream(stream),
            };

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header(header::CONTENT_LENGTH, dl.length)
                .header(header::CONTENT_DISPOSITION, disposition)
                .body(body)
                .unwrap_or_else(|e| {
                    tracing::error!("response build failed: {e}");
                    error_body(StatusCode::INTERNAL_SERVER_ERROR, "download failed")
                })
        }
    }
}

/// Keep the disposition header well-formed no matter what name was uploaded.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_control() || c == '"' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();
    if cleaned.is_empty() {
        "file".into()
    } else {
        cleaned
    }
}
