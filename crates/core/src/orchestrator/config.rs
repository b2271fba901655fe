//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::config::GlobalConfig;

/// Configuration for the upload orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Books processed at the same time. Values below 1 are treated as 1.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Check trackers but never package, submit or archive.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_jobs() -> usize {
    1
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            dry_run: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            jobs: global.jobs,
            dry_run: false,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Effective concurrency.
    pub fn concurrency(&self) -> usize {
        self.jobs.max(1)
    }
}
