//! Core request types shared by the fetcher, the feed reflector and the server

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream provider a request targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// YouTube channel/playlist feeds and their videos
    Youtube,
}

impl Source {
    /// All known sources
    pub const ALL: [Source; 1] = [Source::Youtube];

    /// Tag used in URLs and cache file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Youtube => "youtube",
        }
    }

    /// Scheme and host of the upstream site, without a trailing slash
    pub fn upstream_base(&self) -> &'static str {
        match self {
            Source::Youtube => "https://www.youtube.com",
        }
    }

    /// Build the upstream URL for a path (without leading slash) and optional raw query
    pub fn upstream_url(&self, path: &str, raw_query: Option<&str>) -> String {
        let path = path.trim_start_matches('/');
        match raw_query {
            Some(query) if !query.is_empty() => {
                format!("{}/{}?{}", self.upstream_base(), path, query)
            }
            _ => format!("{}/{}", self.upstream_base(), path),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| Error::UnsupportedSource(s.to_string()))
    }
}

/// A request to fetch the media behind an upstream URI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Content source
    pub source: Source,
    /// Content uri
    pub uri: String,
}

impl FetchRequest {
    /// Create a new fetch request
    pub fn new(source: Source, uri: impl Into<String>) -> Self {
        Self {
            source,
            uri: uri.into(),
        }
    }
}
