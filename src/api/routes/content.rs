//! Content handler: GET /content/:source/*path

use crate::api::AppState;
use crate::api::error_response::error_response;
use crate::error::Result;
use crate::types::{FetchRequest, Source};
use axum::{
    body::Body,
    extract::{Path, RawQuery, Request, State},
    http::{HeaderValue, header},
    response::Response,
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// GET /content/:source/*path - Serve the media behind an upstream page
///
/// The file comes from the fetch queue, downloading it first on a cache miss.
/// A client that disconnects while waiting for acceptance cancels its
/// submission. The worker stays leased until the response body has been sent
/// or dropped, so the file cannot be evicted mid-transfer.
pub async fn serve_content(
    State(state): State<AppState>,
    Path((source, path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    request: Request,
) -> Result<Response> {
    let source: Source = source.parse()?;
    let uri = source.upstream_url(&path, query.as_deref());

    // fires when this handler future is dropped, i.e. the client went away
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let lease = state
        .fetcher
        .submit_task(&cancel, FetchRequest::new(source, uri))
        .await?;

    let file = match lease.result() {
        Ok(file) => file.to_path_buf(),
        Err(e) => {
            let response = error_response(e);
            lease.finish();
            return Ok(response);
        }
    };

    let response = match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    tracing::debug!(
        path = %file.display(),
        status = %response.status(),
        "serving cached content"
    );

    let (mut parts, body) = response.into_parts();
    if parts.status.is_success() {
        match HeaderValue::from_str(&state.config.feed.content_mime_type) {
            Ok(mime) => {
                parts.headers.insert(header::CONTENT_TYPE, mime);
            }
            Err(e) => tracing::warn!(error = %e, "invalid content MIME type, keeping guessed type"),
        }
    }

    // the lease rides along with the body stream and is released when it is dropped
    let stream = Body::new(body).into_data_stream().map(move |chunk| {
        let _held = &lease;
        chunk
    });

    Ok(Response::from_parts(parts, Body::from_stream(stream)))
}
