//! Project Service
//!
//! Business logic for project registration.

use sqlx::PgPool;
use tern_core::domain::project::Project;
use tern_core::dto::project::CreateProject;
use uuid::Uuid;

use crate::repository::project_repository;

/// Service error type
#[derive(Debug)]
pub enum ProjectError {
    NotFound(Uuid),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for ProjectError {
    fn from(err: sqlx::Error) -> Self {
        ProjectError::DatabaseError(err)
    }
}

/// Register a new project
pub async fn create_project(pool: &PgPool, req: CreateProject) -> Result<Project, ProjectError> {
    validate_create_request(&req)?;

    let project = project_repository::create(pool, req).await?;

    tracing::info!("Project created: {} ({})", project.name, project.id);

    Ok(project)
}

/// Get a project by ID
pub async fn get_project(pool: &PgPool, id: Uuid) -> Result<Project, ProjectError> {
    project_repository::find_by_id(pool, id)
        .await?
        .ok_or(ProjectError::NotFound(id))
}

/// List all projects
pub async fn list_projects(pool: &PgPool) -> Result<Vec<Project>, ProjectError> {
    let projects = project_repository::list_all(pool).await?;
    Ok(projects)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_create_request(req: &CreateProject) -> Result<(), ProjectError> {
    if req.name.trim().is_empty() {
        return Err(ProjectError::ValidationError(
            "Project name cannot be empty".to_string(),
        ));
    }

    if req.repo.trim().is_empty() {
        return Err(ProjectError::ValidationError(
            "Project repository cannot be empty".to_string(),
        ));
    }

    Ok(())
}
