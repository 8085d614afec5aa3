//! Statistical computations for regridded DeepMIP fields
//!
//! # Organization
//!
//! - [`operations`]: the reported statistics and their container
//! - [`parallel`]: rayon-based global reductions
//! - [`levels`]: vertical level selection for 4-D variables
//! - [`aggregate`]: per-file aggregation (the pipeline's aggregator)
//! - [`ensemble`]: median and z-scores across models

pub mod aggregate;
pub mod ensemble;
pub mod levels;
pub mod operations;
pub mod parallel;

// Re-export the main types and functions for convenience
pub use aggregate::{aggregate_file, AggregateResult};
pub use ensemble::{abs_z_scores, nan_median, Z_SCORE_LIMIT};
pub use levels::{choose_level, LevelSelection};
pub use operations::{FieldStats, StatOperation};
pub use parallel::{latitude_weights, parallel_field_stats};
