//! Change-action resolver for the recent-changes stack.
//!
//! A pending change can be restored, discarded or have its reason edited.
//! [`resolve_action`] turns exactly one of those choices into the API call
//! that performs it, without doing any I/O. [`complete`] issues the call and
//! sorts the outcome into what the user should see.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::api::{ApiRequest, HttpMethod, StatusApi};
use crate::errors::{RemoteApiError, ResolveError};
use crate::models::ReasonCategory;

/// The three mutually exclusive things a user can do to a stack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Restore,
    Discard,
    Update,
}

/// Submit-button state from a recent-changes form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionFlags {
    pub restore: bool,
    pub discard: bool,
    pub update: bool,
}

impl ActionFlags {
    /// Pick the single selected action.
    pub fn selected(&self) -> Result<ChangeAction, ResolveError> {
        let chosen: Vec<ChangeAction> = [
            (self.restore, ChangeAction::Restore),
            (self.discard, ChangeAction::Discard),
            (self.update, ChangeAction::Update),
        ]
        .into_iter()
        .filter_map(|(set, action)| set.then_some(action))
        .collect();

        match chosen.as_slice() {
            [action] => Ok(*action),
            other => Err(ResolveError::InvalidAction {
                selected: other.len(),
            }),
        }
    }
}

/// A fully described API call plus the message to flash when it succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAction {
    pub request: ApiRequest,
    pub success_message: &'static str,
}

/// How a completed action should be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The API accepted the change.
    Succeeded(&'static str),
    /// The API refused with a message meant for the user.
    Rejected(String),
}

/// Resolve a stack action into the request that performs it.
///
/// `reason` and `reason_category` only matter for [`ChangeAction::Update`].
pub fn resolve_action(
    change_id: u64,
    action: ChangeAction,
    reason: Option<&str>,
    reason_category: Option<&str>,
) -> Result<ResolvedAction, ResolveError> {
    if change_id == 0 {
        return Err(ResolveError::InvalidId(change_id.to_string()));
    }

    let path = format!("/stack/{}", change_id);
    let resolved = match action {
        ChangeAction::Restore => ResolvedAction {
            request: ApiRequest::new(HttpMethod::Delete, path).param("revert", "1"),
            success_message: "Status change restored.",
        },
        ChangeAction::Discard => ResolvedAction {
            request: ApiRequest::new(HttpMethod::Delete, path).param("revert", "0"),
            success_message: "Status change discarded.",
        },
        ChangeAction::Update => ResolvedAction {
            request: ApiRequest::new(HttpMethod::Patch, path)
                .json(build_update_body(reason, reason_category)),
            success_message: "Status change updated.",
        },
    };

    debug!(change_id, ?action, method = %resolved.request.method, "resolved stack action");
    Ok(resolved)
}

/// Resolve an edit of a tree log entry. Uses the same body as a stack update.
pub fn resolve_log_update(
    log_id: u64,
    reason: Option<&str>,
    reason_category: Option<&str>,
) -> Result<ResolvedAction, ResolveError> {
    if log_id == 0 {
        return Err(ResolveError::InvalidId(log_id.to_string()));
    }

    Ok(ResolvedAction {
        request: ApiRequest::new(HttpMethod::Patch, format!("/log/{}", log_id))
            .json(build_update_body(reason, reason_category)),
        success_message: "Log entry updated.",
    })
}

/// Build the PATCH body for editing a change's reason and category.
///
/// An unknown category is dropped rather than failing the request. The
/// result may be empty.
pub fn build_update_body(reason: Option<&str>, reason_category: Option<&str>) -> Value {
    let mut body = Map::new();

    // NOTE: an empty reason is skipped, so a reason can never be cleared
    // through this path. Kept until the API grows an explicit "clear" field.
    if let Some(reason) = reason.filter(|r| !r.is_empty()) {
        body.insert("reason".into(), Value::String(reason.to_string()));
    }

    match reason_category.filter(|c| !c.is_empty()) {
        Some(category) if ReasonCategory::is_valid(category) => {
            body.insert(
                "tags".into(),
                Value::Array(vec![Value::String(category.to_string())]),
            );
        }
        Some(category) => {
            warn!(category, "ignoring unknown reason category");
        }
        None => {}
    }

    Value::Object(body)
}

/// Issue a resolved action and classify the result.
///
/// Errors carrying a user-facing detail become [`ActionOutcome::Rejected`];
/// anything else is returned as an error for the caller's error boundary.
pub async fn complete(
    api: &dyn StatusApi,
    resolved: &ResolvedAction,
) -> Result<ActionOutcome, RemoteApiError> {
    match api.request(&resolved.request).await {
        Ok(_) => {
            info!(
                method = %resolved.request.method,
                path = %resolved.request.path,
                "treestatus change applied"
            );
            Ok(ActionOutcome::Succeeded(resolved.success_message))
        }
        Err(e) => match e.detail() {
            Some(detail) => {
                warn!(path = %resolved.request.path, detail, "treestatus change rejected");
                Ok(ActionOutcome::Rejected(detail.to_string()))
            }
            None => Err(e),
        },
    }
}
