//! deepmip_check: consistency checks for the DeepMIP-Eocene model database
//!
//! For every experiment of the ensemble, each (model, variable) data file
//! is located through the DeepMIP naming convention, regridded onto a
//! common grid with the external `cdo` tool, reduced to global statistics
//! and checked against the variable's valid range. The results end up in
//! one overview table per experiment, where missing files, tool failures,
//! unreadable data and outliers against the ensemble are easy to spot.
//!
//! ## Module Organization
//!
//! - [`dictionaries`]: model, experiment and variable reference data
//! - [`naming`]: file naming convention and the file existence gate
//! - [`regrid`]: the `cdo` regridder adapter
//! - [`netcdf_io`]: netCDF reading helpers
//! - [`statistics`]: aggregation, level selection and ensemble statistics
//! - [`sanity`]: range checks
//! - [`table`]: overview table building and serialization
//! - [`orchestrator`]: work enumeration and the concurrent pipeline
//! - [`bulk_regrid`]: regridding a variable list for the whole ensemble
//! - [`config`], [`cli`], [`parallel`], [`logging`]: run setup
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//! ```rust,no_run
//! use deepmip_check::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<()> {
//! let dicts = Arc::new(Dictionaries::deepmip_eocene()?);
//! let config = Arc::new(RunConfig::new("/data/deepmip-eocene-p1"));
//! let plan = plan(&dicts, &config)?;
//! let regridder = Arc::new(CdoRegridder::new(config.regrid.clone()));
//! let summary = run(plan, dicts, config, regridder).await?;
//! summary.print_info();
//! # Ok(())
//! # }
//! ```

pub mod bulk_regrid;
pub mod cli;
pub mod config;
pub mod dictionaries;
pub mod errors;
pub mod logging;
pub mod naming;
pub mod netcdf_io;
pub mod orchestrator;
pub mod parallel;
pub mod progress;
pub mod regrid;
pub mod sanity;
pub mod statistics;
pub mod table;

pub use errors::{DeepMipError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{RegridSettings, RunConfig};
    pub use crate::dictionaries::{Dictionaries, Realm};
    pub use crate::errors::{DeepMipError, Result};
    pub use crate::naming::Period;
    pub use crate::orchestrator::{plan, run, Plan, RunSummary, WorkUnit};
    pub use crate::parallel::ParallelConfig;
    pub use crate::regrid::{CdoRegridder, RegridRequest, Regridder};
    pub use crate::statistics::{aggregate_file, AggregateResult, FieldStats, StatOperation};
    pub use crate::table::{CellOutcome, OverviewTable, RowStatus, TableBuilder, TableKey};
}
