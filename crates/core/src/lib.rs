//! Treestatus dashboard core library.
//!
//! Domain models for trees, their logs and the recent-changes stack, the
//! resolver that turns stack actions into API calls, form validation,
//! configuration, and clients for the remote Treestatus API.

pub mod api;
pub mod config;
pub mod errors;
pub mod forms;
pub mod models;
pub mod resolver;

// Re-exports for convenience.
pub use api::{StatusApi, StubStatusApi};
pub use config::AppConfig;
pub use models::{ReasonCategory, TreeStatus};
