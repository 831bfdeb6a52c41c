//! PostgreSQL implementation of the runner's store traits

use async_trait::async_trait;
use sqlx::PgPool;
use tern_core::domain::job::JobStatus;
use tern_core::domain::log::LogLevel;
use tern_runner::{JobRepository, LogRepository};
use uuid::Uuid;

use crate::repository::{job_repository, log_repository};

/// Store handle given to the job runner
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgStore {
    async fn update_status(&self, job_id: Uuid, status: JobStatus) -> anyhow::Result<bool> {
        Ok(job_repository::transition_status(&self.pool, job_id, status).await?)
    }
}

#[async_trait]
impl LogRepository for PgStore {
    async fn append(&self, job_id: Uuid, level: LogLevel, message: &str) -> anyhow::Result<()> {
        log_repository::append(&self.pool, job_id, level, message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_core::dto::job::CreateJob;
    use tern_core::dto::project::CreateProject;

    use crate::db;
    use crate::repository::project_repository;

    async fn pending_job(pool: &PgPool) -> Uuid {
        db::run_migrations(pool).await.unwrap();

        let project = project_repository::create(
            pool,
            CreateProject {
                name: "demo".to_string(),
                repo: "https://git.example.com/demo.git".to_string(),
            },
        )
        .await
        .unwrap();

        job_repository::create(
            pool,
            CreateJob {
                project_id: project.id,
                branch: "main".to_string(),
            },
        )
        .await
        .unwrap()
        .id
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn test_status_updates_are_guarded(pool: PgPool) {
        let job_id = pending_job(&pool).await;
        let store = PgStore::new(pool.clone());

        assert!(!store.update_status(job_id, JobStatus::Succeeded).await.unwrap());
        assert!(store.update_status(job_id, JobStatus::Running).await.unwrap());
        assert!(!store.update_status(job_id, JobStatus::Running).await.unwrap());
        assert!(store.update_status(job_id, JobStatus::Succeeded).await.unwrap());
        assert!(!store.update_status(job_id, JobStatus::Failed).await.unwrap());

        let job = job_repository::find_by_id(&pool, job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn test_logs_read_back_in_write_order(pool: PgPool) {
        let job_id = pending_job(&pool).await;
        let store = PgStore::new(pool.clone());

        let written: Vec<String> = (0..50).map(|i| format!("line {}", i)).collect();
        for line in &written {
            store.append(job_id, LogLevel::Info, line).await.unwrap();
        }
        store
            .append(job_id, LogLevel::Error, "Step 1 failed")
            .await
            .unwrap();

        let first = log_repository::find_by_job(&pool, job_id).await.unwrap();
        let second = log_repository::find_by_job(&pool, job_id).await.unwrap();
        assert_eq!(first, second);

        let messages: Vec<String> = first.iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages[..50], written[..]);
        assert_eq!(messages[50], "Step 1 failed");
        assert_eq!(first[50].level, LogLevel::Error);
        assert!(first.windows(2).all(|w| w[0].id < w[1].id));
    }
}
