//! Feed handler: GET /rss/:source/*path

use super::CONTENT_PREFIX;
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::feed::LinkTarget;
use crate::types::Source;
use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// GET /rss/:source/*path - Reflect an upstream feed as podcast RSS
///
/// The upstream URL is the source's base plus `path` and the raw query, e.g.
/// `/rss/youtube/feeds/videos.xml?channel_id=X` reads
/// `https://www.youtube.com/feeds/videos.xml?channel_id=X`.
pub async fn reflect_feed(
    State(state): State<AppState>,
    Path((source, path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response> {
    let source: Source = source.parse()?;
    if !state.config.fetcher.sources.contains(&source) {
        return Err(Error::UnsupportedSource(source.to_string()));
    }

    let target = LinkTarget {
        host: request_host(&headers, &state),
        content_prefix: format!("{}/{}", CONTENT_PREFIX, source),
    };
    let upstream = source.upstream_url(&path, query.as_deref());

    let body = state.reflector.reflect(&upstream, &target).await?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(RSS_CONTENT_TYPE))],
        body,
    )
        .into_response())
}

/// Host the client used to reach us, falling back to the bind address
fn request_host(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.server.bind_address.to_string())
}
