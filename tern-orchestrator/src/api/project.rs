//! Project API Handlers
//!
//! HTTP endpoints for project registration.

use axum::{
    Json,
    extract::{Path, State},
};
use tern_core::domain::project::Project;
use tern_core::dto::project::CreateProject;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::project_service;

/// POST /project/create
/// Register a new project
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProject>,
) -> ApiResult<Json<Project>> {
    tracing::info!("Creating project: {}", req.name);

    let project = project_service::create_project(&state.pool, req).await?;

    Ok(Json(project))
}

/// GET /project/list
/// List all projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    tracing::debug!("Listing all projects");

    let projects = project_service::list_projects(&state.pool).await?;

    Ok(Json(projects))
}

/// GET /project/{id}
/// Get project by ID
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    tracing::debug!("Getting project: {}", id);

    let project = project_service::get_project(&state.pool, id).await?;

    Ok(Json(project))
}
