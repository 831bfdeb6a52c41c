//! Project Repository
//!
//! Handles all database operations related to projects.

use sqlx::PgPool;
use tern_core::domain::project::Project;
use tern_core::dto::project::CreateProject;
use uuid::Uuid;

/// Create a new project in the database
pub async fn create(pool: &PgPool, req: CreateProject) -> Result<Project, sqlx::Error> {
    let project = Project {
        id: Uuid::new_v4(),
        name: req.name,
        repo: req.repo,
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, repo, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(project.id)
    .bind(&project.name)
    .bind(&project.repo)
    .bind(project.created_at)
    .execute(pool)
    .await?;

    Ok(project)
}

/// Find a project by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT id, name, repo, created_at
        FROM projects
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all projects, oldest first
pub async fn list_all(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT id, name, repo, created_at
        FROM projects
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    repo: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            repo: row.repo,
            created_at: row.created_at,
        }
    }
}
