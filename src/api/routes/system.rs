//! System handlers: health and fallback.

use crate::api::error_response::generic_response;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Anything not routed
pub async fn not_found() -> Response {
    generic_response(StatusCode::NOT_FOUND)
}
