//! DeepMIP file naming convention and the file existence gate
//!
//! Every data file of the database lives at
//!
//! ```text
//! <root>/<family>/<model>/<experiment>/<version>/<period-dir>/<var>_<model>_<experiment>_<version>[.<period>].nc
//! ```
//!
//! where the `.<period>` part is absent for time-invariant boundary conditions.

use crate::dictionaries::Dictionaries;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Temporal aggregation of a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    /// Climatological (annual or monthly) mean
    Mean,
    /// Monthly time series
    TimeSeries,
}

impl Period {
    /// Name used in file names and table titles
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::TimeSeries => "time_series",
        }
    }

    /// Directory below `<version>` that holds files of this period
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::Mean => "climatology",
            Self::TimeSeries => "time_series",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" | "climatology" => Ok(Self::Mean),
            "time_series" | "time-series" | "timeseries" => Ok(Self::TimeSeries),
            other => Err(format!(
                "Invalid period '{}': expected 'mean' or 'time-series'",
                other
            )),
        }
    }
}

/// Builds the expected source path for one (experiment, model, variable) triple.
///
/// Returns `None` when any of the three keys is not in the dictionaries.
pub fn resolve_source_path(
    dicts: &Dictionaries,
    root: &Path,
    experiment: &str,
    model: &str,
    variable: &str,
    period: Period,
) -> Option<PathBuf> {
    dicts.experiment(experiment)?;
    let model_info = dicts.model(model)?;
    let variable_info = dicts.variable(variable)?;

    let version = &model_info.version;
    let file_name = if variable_info.is_boundary_condition() {
        format!("{variable}_{model}_{experiment}_{version}.nc")
    } else {
        format!(
            "{variable}_{model}_{experiment}_{version}.{}.nc",
            period.as_str()
        )
    };

    Some(
        root.join(&model_info.family)
            .join(model)
            .join(experiment)
            .join(version)
            .join(period.directory())
            .join(file_name),
    )
}

/// Directory holding all files of one model run, as used by bulk regridding
pub fn run_directory(
    dicts: &Dictionaries,
    root: &Path,
    experiment: &str,
    model: &str,
    period: Period,
) -> Option<PathBuf> {
    dicts.experiment(experiment)?;
    let model_info = dicts.model(model)?;
    Some(
        root.join(&model_info.family)
            .join(model)
            .join(experiment)
            .join(&model_info.version)
            .join(period.directory()),
    )
}

/// Read-only existence check; a missing file is not an error.
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}
