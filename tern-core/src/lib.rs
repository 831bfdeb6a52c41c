//! Tern Core
//!
//! Core types and abstractions for the Tern CI runner.
//!
//! This crate contains:
//! - Domain types: Core business entities (Project, Job, Step, etc.)
//! - DTOs: Request types accepted by the orchestrator
//! - Manifest: Parsing of the `tern.yml` pipeline manifest

pub mod domain;
pub mod dto;
pub mod manifest;
