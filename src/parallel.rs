//! Parallel processing configuration
//!
//! The rayon pool runs the field reductions inside blocking tasks; its size
//! also gives the default number of pipeline workers.

use crate::errors::{DeepMipError, Result};
use rayon::ThreadPoolBuilder;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Set up the global Rayon thread pool with the specified configuration
    pub fn setup_global_pool(&self) -> Result<()> {
        if let Some(num_threads) = self.num_threads {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    DeepMipError::ThreadPoolError(format!(
                        "Failed to initialize thread pool with {} threads: {}",
                        num_threads, e
                    ))
                })?;
            tracing::debug!("Configured reductions with {} threads", num_threads);
        }
        Ok(())
    }

    /// Number of work-unit workers when none is given: one per core
    pub fn default_workers(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Get information about the current parallel configuration
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
}

impl ParallelInfo {
    pub fn print_info(&self, workers: usize) {
        println!("⚡ Parallel processing:");
        println!("   Pipeline workers: {}", workers);
        println!("   Reduction threads: {}", self.current_threads);
        println!("   Available CPU cores: {}", self.available_cores);
    }
}
