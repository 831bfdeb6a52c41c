//! Core domain types
//!
//! This module contains the core domain structures used across Tern crates.
//! These types represent the fundamental business entities and are shared between
//! the orchestrator (for persistence) and the runner (for execution).

pub mod job;
pub mod log;
pub mod pipeline;
pub mod project;
