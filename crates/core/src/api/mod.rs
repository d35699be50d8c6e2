//! Remote Treestatus API access.
//!
//! [`StatusApi`] is the seam between the dashboard and the service of record.
//! [`http::HttpStatusApi`] talks to the real service; [`stub::StubStatusApi`]
//! is an in-memory stand-in selected at startup for local development and
//! used as a spy in tests. The typed helpers below wrap the read endpoints and
//! the tree mutations; stack and log edits go through [`crate::resolver`].

pub mod http;
pub mod stub;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::RemoteApiError;
use crate::models::{LogEntry, StackEntry, Tree};

pub use http::HttpStatusApi;
pub use stub::StubStatusApi;

/// HTTP verbs the Treestatus API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single call against the API, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The remote Treestatus service.
///
/// Implementations return the `result` member of the response envelope, or
/// `Value::Null` when the response has none.
#[async_trait]
pub trait StatusApi: Send + Sync {
    async fn request(&self, request: &ApiRequest) -> Result<Value, RemoteApiError>;
}

// ---------------------------------------------------------------------------
// Typed helpers
// ---------------------------------------------------------------------------

/// All trees, sorted by name.
pub async fn get_trees(api: &dyn StatusApi) -> Result<Vec<Tree>, RemoteApiError> {
    let result = api.request(&ApiRequest::get("/trees")).await?;

    // The service keys trees by name; a plain list is accepted as well.
    let mut trees: Vec<Tree> = match result {
        Value::Null => Vec::new(),
        Value::Object(_) => decode::<BTreeMap<String, Tree>>(result)?.into_values().collect(),
        other => decode(other)?,
    };
    trees.sort_by(|a, b| a.tree.cmp(&b.tree));
    debug!(count = trees.len(), "fetched trees");
    Ok(trees)
}

pub async fn get_tree(api: &dyn StatusApi, name: &str) -> Result<Tree, RemoteApiError> {
    let result = api.request(&ApiRequest::get(tree_path(name, None)?)).await?;
    decode(result)
}

pub async fn get_tree_logs(api: &dyn StatusApi, name: &str) -> Result<Vec<LogEntry>, RemoteApiError> {
    let result = api
        .request(&ApiRequest::get(tree_path(name, Some("logs"))?))
        .await?;
    decode_list(result)
}

/// `/trees/{name}`, optionally followed by one more fixed segment.
pub fn tree_path(name: &str, suffix: Option<&str>) -> Result<String, RemoteApiError> {
    let mut segments = vec!["trees", name];
    segments.extend(suffix);
    encode_path(&segments).ok_or_else(|| RemoteApiError::InvalidPath(name.to_string()))
}

/// Absolute path built from `segments`, each percent-encoded as exactly one
/// path segment so that `/`, `?` and `#` in a name stay inside it.
///
/// Returns `None` when a segment is empty, `.` or `..`.
pub fn encode_path(segments: &[&str]) -> Option<String> {
    if segments.iter().any(|s| matches!(*s, "" | "." | "..")) {
        return None;
    }
    let mut url = reqwest::Url::parse("http://treestatus.invalid/").ok()?;
    url.path_segments_mut().ok()?.clear().extend(segments);
    Some(url.path().to_string())
}

/// Recent changes, newest first as returned by the service.
pub async fn get_stack(api: &dyn StatusApi) -> Result<Vec<StackEntry>, RemoteApiError> {
    let result = api.request(&ApiRequest::get("/stack")).await?;
    decode_list(result)
}

fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, RemoteApiError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    decode(value)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RemoteApiError> {
    serde_json::from_value(value).map_err(|e| RemoteApiError::Parse(e.to_string()))
}
