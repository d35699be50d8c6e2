//! Domain model types used throughout the Treestatus dashboard.
//!
//! These mirror the JSON the remote Treestatus API returns and bridge the
//! resolver, the API clients and the HTML pages.

use std::str::FromStr;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tree status
// ---------------------------------------------------------------------------

/// Landing status of a tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TreeStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "approval required")]
    ApprovalRequired,
}

impl TreeStatus {
    pub const ALL: [TreeStatus; 3] = [Self::Open, Self::Closed, Self::ApprovalRequired];

    /// Wire value, as the API expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::ApprovalRequired => "approval required",
        }
    }

    /// Label shown in select boxes.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
            Self::ApprovalRequired => "Approval Required",
        }
    }

    /// `(value, label)` pairs in display order.
    pub fn to_choices() -> Vec<(&'static str, &'static str)> {
        Self::ALL.iter().map(|s| (s.as_str(), s.label())).collect()
    }
}

impl std::fmt::Display for TreeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown tree status '{}'", s))
    }
}

// ---------------------------------------------------------------------------
// Reason category
// ---------------------------------------------------------------------------

/// Allowable reasons for a tree closure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReasonCategory {
    #[serde(rename = "No Category")]
    NoCategory,
    #[serde(rename = "Job Backlog")]
    JobBacklog,
    #[serde(rename = "Check-in compilation failure")]
    CheckinCompileFailure,
    #[serde(rename = "Check-in test failure")]
    CheckinTestFailure,
    #[serde(rename = "Planned closure")]
    PlannedClosure,
    #[serde(rename = "Merges")]
    Merges,
    #[serde(rename = "Waiting for coverage")]
    WaitingForCoverage,
    #[serde(rename = "Infrastructure related")]
    InfrastructureRelated,
    #[serde(rename = "Other")]
    Other,
}

impl ReasonCategory {
    pub const ALL: [ReasonCategory; 9] = [
        Self::NoCategory,
        Self::JobBacklog,
        Self::CheckinCompileFailure,
        Self::CheckinTestFailure,
        Self::PlannedClosure,
        Self::Merges,
        Self::WaitingForCoverage,
        Self::InfrastructureRelated,
        Self::Other,
    ];

    /// Wire value. Doubles as the display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCategory => "No Category",
            Self::JobBacklog => "Job Backlog",
            Self::CheckinCompileFailure => "Check-in compilation failure",
            Self::CheckinTestFailure => "Check-in test failure",
            Self::PlannedClosure => "Planned closure",
            Self::Merges => "Merges",
            Self::WaitingForCoverage => "Waiting for coverage",
            Self::InfrastructureRelated => "Infrastructure related",
            Self::Other => "Other",
        }
    }

    /// `(value, label)` pairs in declaration order.
    pub fn to_choices() -> Vec<(&'static str, &'static str)> {
        Self::ALL.iter().map(|c| (c.as_str(), c.as_str())).collect()
    }

    /// Membership test against the closed set of categories.
    pub fn is_valid(value: &str) -> bool {
        value.parse::<Self>().is_ok()
    }
}

impl std::fmt::Display for ReasonCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown reason category '{}'", s))
    }
}

// ---------------------------------------------------------------------------
// Trees and logs
// ---------------------------------------------------------------------------

/// Tree names that collide with fixed dashboard routes.
pub const RESERVED_TREE_NAMES: &[&str] = &["new_tree"];

fn tree_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("tree name pattern is valid")
    })
}

/// Letters, digits, `.`, `_` and `-`, starting with a letter or digit.
pub fn is_valid_tree_name(name: &str) -> bool {
    tree_name_pattern().is_match(name)
}

/// Current state of one tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub tree: String,
    pub status: TreeStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message_of_the_day: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub log_id: Option<u64>,
}

/// One historical status record for a tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: u64,
    pub tree: String,
    pub when: String,
    pub who: String,
    pub status: TreeStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LogEntry {
    pub fn reason_category(&self) -> Option<ReasonCategory> {
        first_category(&self.tags)
    }
}

// ---------------------------------------------------------------------------
// Pending changes (the "stack")
// ---------------------------------------------------------------------------

/// A recorded status change awaiting restore or discard.
///
/// Only `reason` and the category carried in `tags` are user-editable; the
/// tree snapshots are opaque and passed through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StackEntry {
    pub id: u64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: Option<TreeStatus>,
    #[serde(default, rename = "trees")]
    pub affected_trees: Vec<serde_json::Value>,
    pub when: String,
    pub who: String,
}

impl StackEntry {
    pub fn reason_category(&self) -> Option<ReasonCategory> {
        first_category(&self.tags)
    }

    /// Names of the affected trees, for display.
    pub fn tree_names(&self) -> Vec<String> {
        self.affected_trees
            .iter()
            .filter_map(|t| match t {
                serde_json::Value::String(name) => Some(name.clone()),
                other => other.get("tree").and_then(|n| n.as_str()).map(String::from),
            })
            .collect()
    }
}

fn first_category(tags: &[String]) -> Option<ReasonCategory> {
    tags.first().and_then(|t| t.parse().ok())
}
