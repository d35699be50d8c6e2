//! In-memory stand-in for the Treestatus service.
//!
//! Seeded with a few sample trees so the dashboard renders without a backend.
//! Every request is recorded, and a failure can be queued for the next call,
//! which makes it the spy of choice in tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use super::{ApiRequest, HttpMethod, StatusApi};
use crate::errors::RemoteApiError;
use crate::models::{LogEntry, StackEntry, Tree, TreeStatus};

const STUB_USER: &str = "stub@treestatus.local";

#[derive(Default)]
struct StubState {
    trees: BTreeMap<String, Tree>,
    logs: Vec<LogEntry>,
    stack: Vec<StackEntry>,
    next_id: u64,
    calls: Vec<ApiRequest>,
    fail_next: Option<(u16, Option<String>)>,
}

impl StubState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn log(&mut self, tree: &Tree) -> u64 {
        let id = self.next_id();
        self.logs.push(LogEntry {
            id,
            tree: tree.tree.clone(),
            when: Utc::now().to_rfc3339(),
            who: STUB_USER.into(),
            status: tree.status,
            reason: tree.reason.clone(),
            tags: tree.tags.clone(),
        });
        id
    }
}

/// Fake Treestatus service backed by in-process data.
#[derive(Default)]
pub struct StubStatusApi {
    state: Mutex<StubState>,
}

impl StubStatusApi {
    /// An empty service with no trees.
    pub fn new() -> Self {
        Self::default()
    }

    /// A service with sample trees and one remembered closure.
    pub fn seeded() -> Self {
        let stub = Self::new();
        {
            let mut state = stub.lock();
            for (name, status, reason, motd, tags) in [
                ("autoland", TreeStatus::Open, "", "", vec![]),
                (
                    "esr115",
                    TreeStatus::ApprovalRequired,
                    "this is an esr.",
                    "approval is required.",
                    vec!["Planned closure"],
                ),
                ("mozilla-central", TreeStatus::Open, "", "", vec![]),
            ] {
                let mut tree = Tree {
                    tree: name.into(),
                    status,
                    reason: reason.into(),
                    message_of_the_day: motd.into(),
                    tags: tags.into_iter().map(String::from).collect(),
                    log_id: None,
                };
                tree.log_id = Some(state.log(&tree));
                state.trees.insert(name.into(), tree);
            }
            apply_update(
                &mut state,
                &["mozilla-central".to_string()],
                TreeStatus::Closed,
                "we are CLOSED!",
                &["Merges".to_string()],
                None,
                true,
            );
        }
        stub
    }

    /// Make the next request fail with the given status and optional detail.
    pub fn fail_next(&self, status: u16, detail: Option<&str>) {
        self.lock().fail_next = Some((status, detail.map(String::from)));
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.lock().calls.clone()
    }

    /// Ids of the current stack entries, newest first.
    pub fn stack_ids(&self) -> Vec<u64> {
        self.lock().stack.iter().map(|e| e.id).collect()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StatusApi for StubStatusApi {
    async fn request(&self, request: &ApiRequest) -> Result<Value, RemoteApiError> {
        let mut state = self.lock();
        state.calls.push(request.clone());
        debug!(method = %request.method, path = %request.path, "stub treestatus request");

        if let Some((status, detail)) = state.fail_next.take() {
            return Err(api_error(status, detail));
        }

        let segments: Vec<&str> = request
            .path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match (request.method, segments.as_slice()) {
            (HttpMethod::Get, ["trees"]) => Ok(json!(state.trees)),
            (HttpMethod::Patch, ["trees"]) => update_trees(&mut state, request.body.as_ref()),
            (HttpMethod::Get, ["trees", name]) => state
                .trees
                .get(*name)
                .map(|t| json!(t))
                .ok_or_else(|| not_found(format!("No tree {} found.", name))),
            (HttpMethod::Put, ["trees", name]) => add_tree(&mut state, name),
            (HttpMethod::Get, ["trees", name, "logs"]) => {
                if !state.trees.contains_key(*name) {
                    return Err(not_found(format!("No tree {} found.", name)));
                }
                let mut logs: Vec<&LogEntry> =
                    state.logs.iter().filter(|l| l.tree == *name).collect();
                logs.reverse();
                Ok(json!(logs))
            }
            (HttpMethod::Get, ["stack"]) => Ok(json!(state.stack)),
            (HttpMethod::Delete, ["stack", id]) => {
                let revert = request
                    .params
                    .iter()
                    .any(|(k, v)| k == "revert" && v == "1");
                revert_change(&mut state, parse_id(id)?, revert)
            }
            (HttpMethod::Patch, ["stack", id]) => {
                let id = parse_id(id)?;
                let body = request.body.clone().unwrap_or(Value::Null);
                let entry = state
                    .stack
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| not_found(format!("No stack entry {} found.", id)))?;
                if let Some(reason) = body.get("reason").and_then(Value::as_str) {
                    entry.reason = Some(reason.to_string());
                }
                if let Some(tags) = string_list(&body, "tags") {
                    entry.tags = tags;
                }
                Ok(json!(entry))
            }
            (HttpMethod::Patch, ["log", id]) => {
                let id = parse_id(id)?;
                let body = request.body.clone().unwrap_or(Value::Null);
                let entry = state
                    .logs
                    .iter_mut()
                    .find(|l| l.id == id)
                    .ok_or_else(|| not_found(format!("No log entry {} found.", id)))?;
                if let Some(reason) = body.get("reason").and_then(Value::as_str) {
                    entry.reason = reason.to_string();
                }
                if let Some(tags) = string_list(&body, "tags") {
                    entry.tags = tags;
                }
                Ok(json!(entry))
            }
            _ => Err(api_error(404, None)),
        }
    }
}

fn update_trees(state: &mut StubState, body: Option<&Value>) -> Result<Value, RemoteApiError> {
    let body = body.ok_or_else(|| bad_request("A request body is required."))?;
    let names = string_list(body, "trees").unwrap_or_default();
    if names.is_empty() {
        return Err(bad_request("A list of trees is required."));
    }
    if let Some(missing) = names.iter().find(|n| !state.trees.contains_key(*n)) {
        return Err(not_found(format!("No tree {} found.", missing)));
    }
    let status: TreeStatus = body
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_request("A status is required."))?
        .parse()
        .map_err(bad_request)?;
    let reason = body.get("reason").and_then(Value::as_str).unwrap_or("");
    let tags = string_list(body, "tags").unwrap_or_default();
    let motd = body.get("message_of_the_day").and_then(Value::as_str);
    let remember = body.get("remember").and_then(Value::as_bool).unwrap_or(false);

    apply_update(state, &names, status, reason, &tags, motd, remember);
    Ok(Value::Null)
}

fn apply_update(
    state: &mut StubState,
    names: &[String],
    status: TreeStatus,
    reason: &str,
    tags: &[String],
    motd: Option<&str>,
    remember: bool,
) {
    let mut snapshots = Vec::with_capacity(names.len());
    for name in names {
        let Some(previous) = state.trees.get(name).cloned() else {
            continue;
        };
        let mut tree = previous.clone();
        tree.status = status;
        tree.reason = reason.to_string();
        tree.tags = tags.to_vec();
        if let Some(motd) = motd {
            tree.message_of_the_day = motd.to_string();
        }
        tree.log_id = Some(state.log(&tree));
        snapshots.push(json!({
            "tree": name,
            "last_state": {
                "status": previous.status,
                "reason": previous.reason,
                "tags": previous.tags,
                "log_id": previous.log_id,
                "current_status": status,
                "current_reason": reason,
                "current_tags": tags,
                "current_log_id": tree.log_id,
            },
        }));
        state.trees.insert(name.clone(), tree);
    }

    if remember && !snapshots.is_empty() {
        let id = state.next_id();
        state.stack.insert(
            0,
            StackEntry {
                id,
                reason: Some(reason.to_string()),
                tags: tags.to_vec(),
                status: Some(status),
                affected_trees: snapshots,
                when: Utc::now().to_rfc3339(),
                who: STUB_USER.into(),
            },
        );
    }
}

fn add_tree(state: &mut StubState, name: &str) -> Result<Value, RemoteApiError> {
    if state.trees.contains_key(name) {
        return Err(bad_request(format!("Tree {} already exists.", name)));
    }
    let mut tree = Tree {
        tree: name.to_string(),
        status: TreeStatus::Open,
        reason: String::new(),
        message_of_the_day: String::new(),
        tags: Vec::new(),
        log_id: None,
    };
    tree.log_id = Some(state.log(&tree));
    let value = json!(tree);
    state.trees.insert(name.to_string(), tree);
    Ok(value)
}

fn revert_change(state: &mut StubState, id: u64, revert: bool) -> Result<Value, RemoteApiError> {
    let pos = state
        .stack
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| not_found(format!("No stack entry {} found.", id)))?;
    let entry = state.stack.remove(pos);

    if revert {
        for snapshot in &entry.affected_trees {
            let Some(name) = snapshot.get("tree").and_then(Value::as_str) else {
                continue;
            };
            let last = &snapshot["last_state"];
            let Some(mut tree) = state.trees.get(name).cloned() else {
                continue;
            };
            if let Some(status) = last.get("status").and_then(|s| s.as_str()?.parse::<TreeStatus>().ok()) {
                tree.status = status;
            }
            tree.reason = last
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            tree.tags = string_list(last, "tags").unwrap_or_default();
            tree.log_id = Some(state.log(&tree));
            state.trees.insert(name.to_string(), tree);
        }
    }
    Ok(json!(entry))
}

fn string_list(value: &Value, key: &str) -> Option<Vec<String>> {
    value.get(key)?.as_array().map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect()
    })
}

fn parse_id(raw: &str) -> Result<u64, RemoteApiError> {
    raw.parse()
        .map_err(|_| bad_request(format!("Invalid id '{}'.", raw)))
}

fn api_error(status: u16, detail: Option<String>) -> RemoteApiError {
    let title = match status {
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "Error",
    };
    RemoteApiError::Api {
        status,
        title: title.into(),
        detail,
    }
}

fn bad_request(detail: impl Into<String>) -> RemoteApiError {
    api_error(400, Some(detail.into()))
}

fn not_found(detail: impl Into<String>) -> RemoteApiError {
    api_error(404, Some(detail.into()))
}
