//! Error types for the Treestatus core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. The web
//! crate maps them onto responses and the daemon wraps them in `anyhow`.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Remote Status API errors
// ---------------------------------------------------------------------------

/// Errors from calls to the remote Treestatus API.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    /// HTTP-level transport error (network, TLS, timeout).
    #[error("treestatus HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("treestatus API error (HTTP {status}): {}", .detail.as_deref().unwrap_or(.title))]
    Api {
        status: u16,
        title: String,
        detail: Option<String>,
    },

    /// The response body could not be decoded.
    #[error("treestatus response parse error: {0}")]
    Parse(String),

    /// A path segment that cannot be addressed, such as `..`.
    #[error("invalid treestatus path segment: {0:?}")]
    InvalidPath(String),
}

impl RemoteApiError {
    /// Human-readable detail supplied by the API, if any.
    ///
    /// A present detail marks the failure as something to show the user.
    /// Transport and parse failures never carry one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } => detail.as_deref().filter(|d| !d.is_empty()),
            _ => None,
        }
    }

    /// HTTP-like status code, when the failure came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::InvalidPath(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver errors
// ---------------------------------------------------------------------------

/// Errors from turning a user action into an API call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Zero or several of restore / discard / update were selected.
    #[error("exactly one action must be selected, got {selected}")]
    InvalidAction { selected: usize },

    /// Stack and log identifiers are positive integers.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

// ---------------------------------------------------------------------------
// Form errors
// ---------------------------------------------------------------------------

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All validation failures of one submitted form.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("form validation failed: {}", summarize(.errors))]
pub struct FormError {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ResolveError::InvalidAction { selected: 2 };
        assert_eq!(err.to_string(), "exactly one action must be selected, got 2");

        let err = RemoteApiError::Api {
            status: 409,
            title: "Conflict".into(),
            detail: Some("Tree is locked".into()),
        };
        assert_eq!(err.to_string(), "treestatus API error (HTTP 409): Tree is locked");

        let err = RemoteApiError::Api {
            status: 500,
            title: "Internal Server Error".into(),
            detail: None,
        };
        assert!(err.to_string().contains("Internal Server Error"));

        let err = ConfigError::InvalidValue {
            field: "api.url".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("api.url"));
    }

    #[test]
    fn test_remote_error_detail() {
        let err = RemoteApiError::Api {
            status: 400,
            title: "Bad Request".into(),
            detail: Some("Reason is required.".into()),
        };
        assert_eq!(err.detail(), Some("Reason is required."));
        assert_eq!(err.status(), Some(400));

        let err = RemoteApiError::Api {
            status: 400,
            title: "Bad Request".into(),
            detail: Some(String::new()),
        };
        assert_eq!(err.detail(), None);

        let err = RemoteApiError::Parse("eof".into());
        assert_eq!(err.detail(), None);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_form_error_summary() {
        let err = FormError {
            errors: vec![
                FieldError {
                    field: "trees",
                    message: "A selection of trees is required.".into(),
                },
                FieldError {
                    field: "reason",
                    message: "A reason is required.".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("trees: A selection"));
        assert!(text.contains("; reason:"));
    }
}
