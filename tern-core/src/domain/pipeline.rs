//! Pipeline domain types

use serde::{Deserialize, Serialize};

/// One named unit of pipeline work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    /// Container image reference (e.g. `docker.io/alpine:latest`)
    pub image: String,
    /// Shell command, run through `/bin/sh -c`
    pub runs: String,
}

/// Ordered steps of a single run, parsed from the repository manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub steps: Vec<Step>,
}

impl PipelineConfig {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
