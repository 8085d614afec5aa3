//! Bulk regridding of selected variables for the whole ensemble
//!
//! For every model and every experiment it ran, the climatology directory
//! is searched for the single `<var>_*.mean.nc` file of each requested
//! variable, which is then interpolated onto the target grid with the
//! realm's method. Sea surface temperature additionally gets a copy with
//! land points filled from the nearest ocean neighbour.

use crate::dictionaries::{Dictionaries, Realm};
use crate::errors::{DeepMipError, Result};
use crate::naming::{run_directory, Period};
use crate::regrid::{regridded_file_name, CdoRegridder};
use futures::stream::{self, StreamExt};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_VARIABLES: [&str; 3] = ["tas", "tos", "pr"];

/// Variables that also get a land-filled copy
const FILLED_VARIABLES: [&str; 1] = ["tos"];

/// One input file to regrid
#[derive(Debug, Clone, PartialEq)]
pub struct BulkJob {
    pub model: String,
    pub experiment: String,
    pub variable: String,
    pub realm: Realm,
    pub input: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    Regridded {
        output: PathBuf,
        filled: Option<PathBuf>,
    },
    /// Output already present and `force` not set
    Cached(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct BulkSummary {
    pub regridded: usize,
    pub cached: usize,
    pub failed: usize,
    /// (model, experiment, variable) without an input file
    pub skipped: usize,
    pub outputs: Vec<PathBuf>,
}

impl BulkSummary {
    pub fn print_info(&self) {
        println!("📊 Regridding summary:");
        println!("   Regridded: {}", self.regridded);
        println!("   Reused: {}", self.cached);
        println!("   Skipped (no input): {}", self.skipped);
        println!("   Failed: {}", self.failed);
    }
}

/// The single climatology file of `variable` in `dir`.
///
/// `Ok(None)` when there is none (or the directory does not exist); a
/// [`DeepMipError::Data`] error when the choice is ambiguous.
pub fn find_input(dir: &Path, variable: &str) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let prefix = format!("{variable}_");
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(&prefix) && n.ends_with(".mean.nc"))
        })
        .collect();
    matches.sort();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        n => Err(DeepMipError::data(
            dir,
            format!("{} files found for variable {}", n, variable),
        )),
    }
}

/// Enumerate all bulk jobs. Returns the jobs and the number of skipped combinations.
pub fn collect_jobs(
    dicts: &Dictionaries,
    root: &Path,
    variables: &[String],
) -> Result<(Vec<BulkJob>, usize)> {
    let mut realms = Vec::with_capacity(variables.len());
    for variable in variables {
        let record = dicts.variable(variable).ok_or_else(|| {
            DeepMipError::Configuration(format!(
                "variable {} not found in the DeepMIP variable dictionary",
                variable
            ))
        })?;
        realms.push(record.realm);
    }

    let mut jobs = Vec::new();
    let mut skipped = 0;
    for (model, record) in &dicts.models {
        for experiment in &record.experiments {
            let Some(dir) = run_directory(dicts, root, experiment, model, Period::Mean) else {
                continue;
            };
            for (variable, realm) in variables.iter().zip(&realms) {
                tracing::debug!("Processing model {} and variable {} for experiment {}", model, variable, experiment);
                match find_input(&dir, variable)? {
                    Some(input) => jobs.push(BulkJob {
                        model: model.clone(),
                        experiment: experiment.clone(),
                        variable: variable.clone(),
                        realm: *realm,
                        input,
                    }),
                    None => {
                        tracing::debug!("No file found for variable {} in {}. Skipping", variable, dir.display());
                        skipped += 1;
                    }
                }
            }
        }
    }
    Ok((jobs, skipped))
}

/// Regrid one job into the regridder's output directory.
///
/// A job counts as cached only when every file it produces exists; a
/// regridded `tos` file without its filled copy only reruns the fill step.
pub async fn regrid_job(regridder: &CdoRegridder, job: &BulkJob) -> BulkOutcome {
    let settings = regridder.settings();
    let output = settings
        .output_dir
        .join(regridded_file_name(&job.input, &settings.grid));
    let filled = FILLED_VARIABLES
        .contains(&job.variable.as_str())
        .then(|| filled_path(&output));

    let reuse_output = !settings.force && output.is_file();
    if reuse_output && filled.as_ref().map_or(true, |f| f.is_file()) {
        return BulkOutcome::Cached(output);
    }

    if !reuse_output {
        if let Err(e) = std::fs::create_dir_all(&settings.output_dir) {
            return BulkOutcome::Failed(DeepMipError::from(e).to_string());
        }

        let args: Vec<OsString> = vec![
            format!("{},{}", settings.method_for(job.realm), settings.grid).into(),
            job.input.clone().into_os_string(),
            output.clone().into_os_string(),
        ];
        if let Err(e) = regridder.run_operator(&args).await {
            tracing::warn!(input = %job.input.display(), "{}", e);
            let _ = std::fs::remove_file(&output);
            return BulkOutcome::Failed(e.to_string());
        }
    } else {
        tracing::debug!(output = %output.display(), "filling land points of existing regridded file");
    }

    if let Some(filled) = &filled {
        let args: Vec<OsString> = vec![
            "-setmisstonn".into(),
            output.clone().into_os_string(),
            filled.clone().into_os_string(),
        ];
        if let Err(e) = regridder.run_operator(&args).await {
            tracing::warn!(input = %output.display(), "{}", e);
            let _ = std::fs::remove_file(filled);
            return BulkOutcome::Failed(e.to_string());
        }
    }

    BulkOutcome::Regridded { output, filled }
}

/// Run every job with at most `concurrency` tool invocations in flight.
pub async fn regrid_all(
    dicts: &Dictionaries,
    root: &Path,
    variables: &[String],
    regridder: &CdoRegridder,
    concurrency: usize,
) -> Result<BulkSummary> {
    let (jobs, skipped) = collect_jobs(dicts, root, variables)?;
    tracing::info!(jobs = jobs.len(), skipped, "bulk regridding");

    let outcomes: Vec<BulkOutcome> = stream::iter(jobs.iter())
        .map(|job| regrid_job(regridder, job))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut summary = BulkSummary {
        skipped,
        ..BulkSummary::default()
    };
    for outcome in outcomes {
        match outcome {
            BulkOutcome::Regridded { output, filled } => {
                summary.regridded += 1;
                summary.outputs.push(output);
                summary.outputs.extend(filled);
            }
            BulkOutcome::Cached(output) => {
                summary.cached += 1;
                summary.outputs.push(output);
            }
            BulkOutcome::Failed(_) => summary.failed += 1,
        }
    }
    summary.outputs.sort();
    Ok(summary)
}

/// `x.r180x90.nc` becomes `x.r180x90.filled.nc`
fn filled_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".nc").unwrap_or(&name);
    output.with_file_name(format!("{stem}.filled.nc"))
}
