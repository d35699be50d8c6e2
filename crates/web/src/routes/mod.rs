//! HTTP route modules.

pub mod changes;
pub mod status;
pub mod trees;
