//! HTTP error response handling
//!
//! Clients only ever see a generic plain-text body chosen by status code. The
//! error itself is logged with its machine-readable code.

use crate::error::{Error, ToHttpStatus};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Body for 404 responses
pub const NOT_FOUND_BODY: &str = "404 rss-reflector not found";

/// Body for 500 responses
pub const INTERNAL_ERROR_BODY: &str = "500 rss-reflector internal server error";

/// Body for 503 responses
pub const UNAVAILABLE_BODY: &str = "503 rss-reflector unavailable";

/// Build the generic response for an error without consuming it
pub fn error_response(error: &Error) -> Response {
    let status_code =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status_code.is_server_error() {
        tracing::error!(code = error.error_code(), error = %error, "request failed");
    } else {
        tracing::info!(code = error.error_code(), error = %error, "request rejected");
    }

    generic_response(status_code)
}

/// A plain-text response carrying only the generic body for `status_code`
pub fn generic_response(status_code: StatusCode) -> Response {
    let body = match status_code {
        StatusCode::NOT_FOUND => NOT_FOUND_BODY,
        StatusCode::SERVICE_UNAVAILABLE => UNAVAILABLE_BODY,
        _ => INTERNAL_ERROR_BODY,
    };
    (status_code, body).into_response()
}

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error_response(&self)
    }
}
