//! Pipeline manifest parser
//!
//! A repository opts into Tern by committing a `tern.yml` file at its root:
//!
//! ```yaml
//! steps:
//!   - name: build
//!     image: docker.io/rust:1
//!     runs: cargo build
//!   - name: test
//!     image: docker.io/rust:1
//!     runs: cargo test
//! ```
//!
//! Only the `steps` key is recognized. Unknown keys are ignored. Step fields
//! are never defaulted: a missing or blank `name`, `image` or `runs` rejects
//! the whole manifest.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::pipeline::{PipelineConfig, Step};

/// File name looked up at the root of a fetched source tree
pub const MANIFEST_FILE_NAME: &str = "tern.yml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found at {}", .0.display())]
    Missing(PathBuf),

    #[error("malformed manifest: {0}")]
    Malformed(String),

    #[error("failed to read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Deserialize)]
struct Manifest {
    steps: Vec<Step>,
}

/// Load the pipeline configuration from a fetched source tree
///
/// # Errors
/// - [`ManifestError::Missing`] if `tern.yml` does not exist in `tree`
/// - [`ManifestError::Malformed`] if it cannot be decoded into steps
/// - [`ManifestError::Io`] for any other read failure
pub fn load_pipeline_config(tree: &Path) -> Result<PipelineConfig, ManifestError> {
    let path = tree.join(MANIFEST_FILE_NAME);

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ManifestError::Missing(path));
        }
        Err(e) => return Err(ManifestError::Io { path, source: e }),
    };

    parse_manifest(&source)
}

/// Parse manifest text into a [`PipelineConfig`]
pub fn parse_manifest(source: &str) -> Result<PipelineConfig, ManifestError> {
    let manifest: Manifest =
        serde_yaml::from_str(source).map_err(|e| ManifestError::Malformed(e.to_string()))?;

    for (idx, step) in manifest.steps.iter().enumerate() {
        validate_step(idx, step)?;
    }

    Ok(PipelineConfig {
        steps: manifest.steps,
    })
}

fn validate_step(idx: usize, step: &Step) -> Result<(), ManifestError> {
    let blank = [
        ("name", &step.name),
        ("image", &step.image),
        ("runs", &step.runs),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    match blank {
        Some((field, _)) => Err(ManifestError::Malformed(format!(
            "step {} has an empty '{}' field",
            idx + 1,
            field
        ))),
        None => Ok(()),
    }
}
