//! Project domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A source repository registered for CI runs
///
/// Projects are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub repo: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Project {
    /// Filesystem-safe form of the project name
    ///
    /// Anything outside `[A-Za-z0-9_-]` becomes `-`, so the result can be used
    /// as a directory name component.
    pub fn slug(&self) -> String {
        let slug: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();

        if slug.is_empty() {
            "project".to_string()
        } else {
            slug
        }
    }
}
