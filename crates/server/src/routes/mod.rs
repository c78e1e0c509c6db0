mod upload;

pub use upload::upload;

use axum::{http::StatusCode, response::IntoResponse, Json};

use docscribe_common::api::{ErrorResponse, HealthResponse};

// ── Shared helpers ─────────────────────────────────────────────────────────────

pub(super) fn error_response(status: StatusCode, msg: impl Into<String>) -> axum::response::Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

// ── GET /api/health ────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".into() })
}
