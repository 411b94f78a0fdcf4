//! Common types for the client SDK

use bytes::Bytes;
use reqwest::{header::HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Storage URL and token issued together by one authentication response
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Base endpoint for account/container/object operations
    pub storage_url: String,
    /// Token sent as `X-Auth-Token`
    pub token: String,
}

impl AuthState {
    pub fn new(storage_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("storage_url", &self.storage_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A completed storage exchange
#[derive(Clone, Debug)]
pub struct StorageResponse {
    /// Status code (always 2xx when handed to callers)
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Bytes,
}

impl StorageResponse {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Header value as a string, if present and printable
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Upload request for [`StorageClient::put_file`](crate::StorageClient::put_file)
#[derive(Clone, Debug)]
pub struct PutFile {
    /// Local file streamed as the request body
    pub src: PathBuf,
    /// Destination path inside the account (leading slash optional)
    pub dst: String,
    /// Extra request headers (e.g. `Content-Type`)
    pub headers: HashMap<String, String>,
}

impl PutFile {
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            headers: HashMap::new(),
        }
    }

    /// Add a request header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Options for listing an account or container
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    /// Maximum number of entries
    pub limit: Option<usize>,
    /// Start listing after this name
    pub marker: Option<String>,
    /// Stop listing before this name
    pub end_marker: Option<String>,
    /// Filter by prefix
    pub prefix: Option<String>,
    /// Delimiter for pseudo-directories
    pub delimiter: Option<String>,
    /// Response format (`json`, `xml`, `plain`)
    pub format: Option<String>,
    /// Any other parameters, sent in insertion order
    pub extra: Vec<(String, String)>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Add an arbitrary query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Form-encoded query string without the leading `?`; empty when no option is set
    pub fn to_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(limit) = self.limit {
            query.append_pair("limit", &limit.to_string());
        }
        let named = [
            ("marker", &self.marker),
            ("end_marker", &self.end_marker),
            ("prefix", &self.prefix),
            ("delimiter", &self.delimiter),
            ("format", &self.format),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                query.append_pair(key, value);
            }
        }
        for (key, value) in &self.extra {
            query.append_pair(key, value);
        }
        query.finish()
    }
}

/// Body of a listing response
#[derive(Clone, Debug, PartialEq)]
pub enum Listing {
    /// Parsed body of an `application/json` response
    Json(serde_json::Value),
    /// Body returned unchanged for any other content type
    Text(String),
}

impl Listing {
    /// Entry names when the listing is JSON (array of strings or of objects with `name`)
    /// or plain text (one name per line)
    pub fn names(&self) -> Vec<String> {
        match self {
            Listing::Json(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(name) => Some(name.clone()),
                    serde_json::Value::Object(map) => map
                        .get("name")
                        .or_else(|| map.get("subdir"))
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    _ => None,
                })
                .collect(),
            Listing::Json(_) => Vec::new(),
            Listing::Text(text) => text
                .lines()
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}
