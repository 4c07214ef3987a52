//! Deterministic cache file names for fetch requests.

use crate::error::{Error, Result};
use crate::types::Source;
use url::Url;

/// Stands in for `/` in cache file names
const SEPARATOR_SUBSTITUTE: &str = "_";

/// Escaped form of a literal [`SEPARATOR_SUBSTITUTE`]
const ESCAPED_SUBSTITUTE: &str = "__";

/// Derive the cache file name prefix for a request
///
/// The request URI's path and query are flattened into a single file name:
/// literal `_` is doubled first, then every `/` becomes `_`, and the source tag
/// is prepended. The downloader appends its own extension to this prefix in the
/// scratch directory; the published cache entry uses the prefix verbatim.
///
/// # Examples
///
/// ```
/// use rss_reflector::fetcher::cache_prefix;
/// use rss_reflector::types::Source;
///
/// let prefix = cache_prefix(Source::Youtube, "https://www.youtube.com/watch?v=a_b").unwrap();
/// assert_eq!(prefix, "youtube__watch?v=a__b");
/// ```
pub fn cache_prefix(source: Source, uri: &str) -> Result<String> {
    let url = Url::parse(uri).map_err(|e| Error::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;

    let mut request_uri = url.path().to_string();
    if let Some(query) = url.query() {
        request_uri.push('?');
        request_uri.push_str(query);
    }

    let flattened = request_uri
        .replace(SEPARATOR_SUBSTITUTE, ESCAPED_SUBSTITUTE)
        .replace('/', SEPARATOR_SUBSTITUTE);

    Ok(format!("{}{}{}", source, SEPARATOR_SUBSTITUTE, flattened))
}
