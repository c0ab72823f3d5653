//! Thread pool configuration for bin reductions
//!
//! Group reductions and pooled-cell reductions run on Rayon's global thread pool.
//! Its size comes from the run parameters, optionally overridden on the command line.

use crate::errors::{GeoCubeError, Result};
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

/// Size of the reduction thread pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// `None` keeps Rayon's default of one thread per core
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    #[must_use]
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// # Errors
    ///
    /// Returns `InvalidParameter` for a pool of zero threads.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(GeoCubeError::InvalidParameter {
                message: "threads must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Install this configuration as the global Rayon pool
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for zero threads, `ThreadPoolError` if the global
    /// pool was already initialized or cannot be built.
    pub fn setup_global_pool(&self) -> Result<()> {
        self.validate()?;

        let Some(num_threads) = self.num_threads else {
            tracing::info!("reducing on the default thread pool");
            return Ok(());
        };

        ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("geocube-reduce-{i}"))
            .build_global()
            .map_err(|e| {
                GeoCubeError::ThreadPoolError(format!(
                    "Failed to initialize thread pool with {} threads: {}",
                    num_threads, e
                ))
            })?;

        tracing::info!(threads = num_threads, "configured reduction thread pool");
        Ok(())
    }
}

/// Get information about the reduction thread pool
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
    }
}

/// Reduction pool size against the machine's cores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
}

impl ParallelInfo {
    pub fn log(&self) {
        if self.current_threads > self.available_cores {
            tracing::warn!(
                current_threads = self.current_threads,
                available_cores = self.available_cores,
                "more reduction threads than cores"
            );
        } else {
            tracing::debug!(
                current_threads = self.current_threads,
                available_cores = self.available_cores,
                "reduction thread pool"
            );
        }
    }
}
