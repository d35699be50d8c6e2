//! One-shot flash messages and the post-action redirect target.
//!
//! Messages ride in a cookie (URL-safe base64 of a JSON list) set on the
//! redirect and cleared by the next page render.

use axum::http::header::{COOKIE, HOST, REFERER, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const FLASH_COOKIE: &str = "treestatus_flash";

/// Where users land when the referrer is missing or foreign.
pub const DEFAULT_RETURN_PATH: &str = "/treestatus";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: "success".into(),
            message: message.into(),
        }
    }
}

/// `Set-Cookie` value carrying the given messages.
pub fn cookie_value(messages: &[Flash]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE,
        URL_SAFE_NO_PAD.encode(json)
    )
}

/// `Set-Cookie` value that removes the flash cookie.
pub fn clear_cookie_value() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", FLASH_COOKIE)
}

/// Read pending messages from the request cookies. Garbage is dropped.
pub fn read(headers: &HeaderMap) -> Vec<Flash> {
    let Some(raw) = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .map(|(_, value)| value)
    else {
        return Vec::new();
    };

    URL_SAFE_NO_PAD
        .decode(raw)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_else(|| {
            debug!("discarding unreadable flash cookie");
            Vec::new()
        })
}

/// 303 to `target`, setting a flash cookie on the way.
pub fn redirect_with(target: &str, flash: Flash) -> Response {
    (
        [(SET_COOKIE, cookie_value(&[flash]))],
        Redirect::to(target),
    )
        .into_response()
}

/// Path of the referring page when it belongs to this site.
///
/// Accepts a bare local path, or an absolute URL whose authority matches the
/// request `Host`. Anything else yields [`DEFAULT_RETURN_PATH`].
pub fn local_referrer(headers: &HeaderMap) -> String {
    let Some(referer) = headers.get(REFERER).and_then(|v| v.to_str().ok()) else {
        return DEFAULT_RETURN_PATH.to_string();
    };

    // Browsers read `/\host` the same as `//host`.
    if referer.starts_with('/') && !referer.starts_with("//") && !referer.starts_with("/\\") {
        return referer.to_string();
    }

    let host = headers.get(HOST).and_then(|v| v.to_str().ok());
    let Ok(url) = reqwest::Url::parse(referer) else {
        return DEFAULT_RETURN_PATH.to_string();
    };
    let authority = match (url.host_str(), url.port()) {
        (Some(h), Some(p)) => format!("{}:{}", h, p),
        (Some(h), None) => h.to_string(),
        (None, _) => return DEFAULT_RETURN_PATH.to_string(),
    };

    if host.is_some_and(|h| h.eq_ignore_ascii_case(&authority)) {
        match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        }
    } else {
        debug!(referer, "ignoring foreign referrer");
        DEFAULT_RETURN_PATH.to_string()
    }
}
