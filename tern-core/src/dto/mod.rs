//! Data Transfer Objects
//!
//! Request types accepted by the orchestrator's lifecycle API. DTOs carry only
//! the caller-supplied fields; identities and timestamps are assigned on
//! persistence.

pub mod job;
pub mod project;
