//! reqwest-backed client for the remote Treestatus API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{ApiRequest, HttpMethod, StatusApi};
use crate::config::ApiConfig;
use crate::errors::RemoteApiError;

/// RFC 7807 problem body returned by the API on failure.
#[derive(Debug, Default, Deserialize)]
struct Problem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Asynchronous Treestatus API client.
#[derive(Clone)]
pub struct HttpStatusApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStatusApi {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("treestatus-ui/", env!("CARGO_PKG_VERSION"))),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        info!(base_url = %base_url, "created HttpStatusApi");
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, RemoteApiError> {
        Self::new(
            config.url.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StatusApi for HttpStatusApi {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn request(&self, request: &ApiRequest) -> Result<Value, RemoteApiError> {
        let url = self.url(&request.path);
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut req = self.http.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        if !request.params.is_empty() {
            req = req.query(&request.params);
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            return Err(problem_error(status, &bytes));
        }

        debug!(status = status.as_u16(), len = bytes.len(), "treestatus response");
        parse_envelope(&bytes)
    }
}

/// Extract `result` from a success body. Empty bodies (e.g. 204) map to null.
fn parse_envelope(bytes: &[u8]) -> Result<Value, RemoteApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    let mut envelope: Value =
        serde_json::from_slice(bytes).map_err(|e| RemoteApiError::Parse(e.to_string()))?;
    Ok(envelope
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

fn problem_error(status: reqwest::StatusCode, bytes: &[u8]) -> RemoteApiError {
    let problem: Problem = serde_json::from_slice(bytes).unwrap_or_else(|_| {
        warn!(status = status.as_u16(), "error response is not a problem document");
        Problem::default()
    });
    RemoteApiError::Api {
        status: status.as_u16(),
        title: problem
            .title
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
        detail: problem.detail,
    }
}
