//! Reasoner configuration

use crate::{ElError, Result};
use serde::{Deserialize, Serialize};

/// Concurrency settings of the reasoning pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Worker threads draining the active-context queue (1 = sequential)
    pub saturation_workers: usize,
    /// Shard the transitive reduction across threads
    pub concurrent_taxonomy: bool,
    /// Partitions of the concept space when `concurrent_taxonomy` is set
    pub taxonomy_workers: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            saturation_workers: parallelism,
            concurrent_taxonomy: true,
            taxonomy_workers: parallelism,
        }
    }
}

impl ReasonerConfig {
    /// Single-threaded, fully deterministic configuration
    pub fn sequential() -> Self {
        Self {
            saturation_workers: 1,
            concurrent_taxonomy: false,
            taxonomy_workers: 1,
        }
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            saturation_workers: workers,
            concurrent_taxonomy: workers > 1,
            taxonomy_workers: workers,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.saturation_workers == 0 {
            return Err(ElError::ContractViolation(
                "saturation_workers must be at least 1".to_string(),
            ));
        }
        if self.taxonomy_workers == 0 {
            return Err(ElError::ContractViolation(
                "taxonomy_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
