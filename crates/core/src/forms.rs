//! Submitted dashboard forms and their validation.
//!
//! Browsers post `application/x-www-form-urlencoded` bodies where checkbox
//! fields repeat, so every form is read from the raw list of pairs. Each
//! validated form becomes a [`ResolvedAction`] ready for
//! [`crate::resolver::complete`].

use serde_json::{json, Map, Value};

use crate::api::{ApiRequest, HttpMethod};
use crate::errors::{FieldError, FormError, ResolveError};
use crate::models::{is_valid_tree_name, ReasonCategory, TreeStatus, RESERVED_TREE_NAMES};
use crate::resolver::{resolve_action, resolve_log_update, ActionFlags, ResolvedAction};

/// Raw `name=value` pairs of a submitted form.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value of `name`, trimmed.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim())
    }

    /// First value of `name` exactly as submitted.
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All non-empty values of `name`, in submission order.
    pub fn get_all(&self, name: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, v)| k == name && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_string())
            .collect()
    }

    /// A submit button or checkbox counts as set when it carries a value.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }

    fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }
}

impl From<Vec<(String, String)>> for FormData {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

fn field_error(field: &'static str, message: impl Into<String>) -> FieldError {
    FieldError {
        field,
        message: message.into(),
    }
}

fn finish<T>(value: T, errors: Vec<FieldError>) -> Result<T, FormError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(FormError { errors })
    }
}

// ---------------------------------------------------------------------------
// Bulk tree update
// ---------------------------------------------------------------------------

/// Change the status of a selection of trees.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTreesForm {
    pub trees: Vec<String>,
    pub status: TreeStatus,
    pub reason: String,
    pub reason_category: Option<ReasonCategory>,
    pub remember: bool,
    pub message_of_the_day: Option<String>,
}

impl UpdateTreesForm {
    pub fn parse(form: &FormData) -> Result<Self, FormError> {
        let mut errors = Vec::new();

        let trees = form.get_all("trees");
        if trees.is_empty() {
            errors.push(field_error("trees", "A selection of trees is required."));
        }

        let status = match form.non_empty("status") {
            Some(raw) => match raw.parse::<TreeStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    errors.push(field_error("status", format!("'{}' is not a valid status.", raw)));
                    None
                }
            },
            None => {
                errors.push(field_error("status", "A status is required."));
                None
            }
        };
        let closing = status.is_some_and(|s| s != TreeStatus::Open);

        let reason = form.get_raw("reason").unwrap_or_default().to_string();
        if closing && reason.trim().is_empty() {
            errors.push(field_error("reason", "A reason is required."));
        }

        let reason_category = match form.non_empty("reason_category") {
            Some(raw) => match raw.parse::<ReasonCategory>() {
                Ok(category) => Some(category),
                Err(_) => {
                    errors.push(field_error(
                        "reason_category",
                        format!("'{}' is not a valid reason category.", raw),
                    ));
                    None
                }
            },
            None => {
                if closing {
                    errors.push(field_error("reason_category", "A reason category is required."));
                }
                None
            }
        };

        let message_of_the_day = form.non_empty("message_of_the_day").map(String::from);

        let Some(status) = status else {
            return Err(FormError { errors });
        };
        finish(
            Self {
                trees,
                status,
                reason,
                reason_category,
                remember: form.flag("remember_this_change"),
                message_of_the_day,
            },
            errors,
        )
    }

    /// `PATCH /trees` with the new state of every selected tree.
    pub fn into_action(self) -> ResolvedAction {
        let mut body = Map::new();
        body.insert("trees".into(), json!(self.trees));
        body.insert("status".into(), json!(self.status));
        body.insert("reason".into(), json!(self.reason));
        body.insert(
            "tags".into(),
            json!(self.reason_category.map(|c| c.as_str()).into_iter().collect::<Vec<_>>()),
        );
        body.insert("remember".into(), json!(self.remember));
        if let Some(motd) = self.message_of_the_day {
            body.insert("message_of_the_day".into(), json!(motd));
        }

        ResolvedAction {
            request: ApiRequest::new(HttpMethod::Patch, "/trees").json(Value::Object(body)),
            success_message: "Tree statuses updated.",
        }
    }
}

// ---------------------------------------------------------------------------
// New tree
// ---------------------------------------------------------------------------

/// Add a tree to Treestatus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTreeForm {
    pub tree: String,
}

impl NewTreeForm {
    pub fn parse(form: &FormData) -> Result<Self, FormError> {
        let tree = form.get("tree").unwrap_or_default().to_string();
        let mut errors = Vec::new();
        if tree.is_empty() {
            errors.push(field_error("tree", "A tree name is required."));
        } else if !is_valid_tree_name(&tree) {
            errors.push(field_error(
                "tree",
                "Tree names may only contain letters, digits, '.', '_' and '-'.",
            ));
        } else if RESERVED_TREE_NAMES.contains(&tree.as_str()) {
            errors.push(field_error("tree", format!("'{}' is a reserved name.", tree)));
        }
        finish(Self { tree }, errors)
    }

    /// `PUT /trees/{tree}` creating an open tree.
    pub fn into_action(self) -> ResolvedAction {
        let body = json!({
            "tree": self.tree,
            "status": TreeStatus::Open,
            "reason": "",
            "message_of_the_day": "",
        });
        ResolvedAction {
            request: ApiRequest::new(HttpMethod::Put, format!("/trees/{}", self.tree)).json(body),
            success_message: "New tree created.",
        }
    }
}

// ---------------------------------------------------------------------------
// Recent changes and log edits
// ---------------------------------------------------------------------------

/// Restore, discard or edit one entry of the recent-changes stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentChangeForm {
    pub flags: ActionFlags,
    pub reason: Option<String>,
    pub reason_category: Option<String>,
}

impl RecentChangeForm {
    pub fn parse(form: &FormData) -> Self {
        Self {
            flags: ActionFlags {
                restore: form.flag("restore"),
                discard: form.flag("discard"),
                update: form.flag("update"),
            },
            reason: form.get_raw("reason").map(String::from),
            reason_category: form.get_raw("reason_category").map(String::from),
        }
    }

    /// Resolve against the stack entry named in the URL.
    pub fn resolve(&self, change_id: u64) -> Result<ResolvedAction, ResolveError> {
        let action = self.flags.selected()?;
        resolve_action(
            change_id,
            action,
            self.reason.as_deref(),
            self.reason_category.as_deref(),
        )
    }
}

/// Edit the reason of a tree log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogUpdateForm {
    pub reason: Option<String>,
    pub reason_category: Option<String>,
}

impl LogUpdateForm {
    pub fn parse(form: &FormData) -> Self {
        Self {
            reason: form.get_raw("reason").map(String::from),
            reason_category: form.get_raw("reason_category").map(String::from),
        }
    }

    pub fn resolve(&self, log_id: u64) -> Result<ResolvedAction, ResolveError> {
        resolve_log_update(
            log_id,
            self.reason.as_deref(),
            self.reason_category.as_deref(),
        )
    }
}
