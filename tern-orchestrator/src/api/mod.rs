//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod project;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::PgPool;
use std::sync::Arc;
use tern_runner::JobRunner;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub runner: Arc<JobRunner>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Project endpoints
        .route("/project/create", post(project::create_project))
        .route("/project/list", get(project::list_projects))
        .route("/project/{id}", get(project::get_project))
        // Job endpoints
        .route("/job/create", post(job::create_job))
        .route("/job/{id}", get(job::get_job))
        .route("/job/{id}/logs", get(job::get_job_logs))
        .route("/job/project/{project_id}", get(job::list_jobs_for_project))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
