//! Regridder adapter around the external Climate Data Operators binary
//!
//! Regridding is delegated entirely to `cdo`, run as a child process per
//! file. A non-zero exit status, a missing output file, a failure to spawn
//! the binary, or an expired timeout are all reported as
//! [`DeepMipError::ExternalTool`]. There are no retries.

use crate::config::RegridSettings;
use crate::dictionaries::Realm;
use crate::errors::{DeepMipError, Result};
use crate::naming::Period;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Monthly steps of the last model year in a 100-year time series
pub const LAST_YEAR_TIMESTEPS: &str = "1189/1200";

/// One file to bring onto the common grid
#[derive(Debug, Clone, PartialEq)]
pub struct RegridRequest {
    pub source: PathBuf,
    pub realm: Realm,
    pub period: Period,
    /// Boundary conditions have no time axis to average over
    pub time_invariant: bool,
}

/// Seam between the pipeline and the external regridding tool
#[async_trait]
pub trait Regridder: Send + Sync {
    /// Returns the path of the regridded file
    async fn regrid(&self, request: &RegridRequest) -> Result<PathBuf>;
}

/// [`Regridder`] backed by `cdo`
#[derive(Debug, Clone)]
pub struct CdoRegridder {
    settings: RegridSettings,
}

impl CdoRegridder {
    pub fn new(settings: RegridSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RegridSettings {
        &self.settings
    }

    /// Distinct output path per source file and period:
    /// `<output-dir>/<period>/<source-stem>.<grid>.nc`
    pub fn output_path(&self, request: &RegridRequest) -> PathBuf {
        self.settings
            .output_dir
            .join(request.period.as_str())
            .join(regridded_file_name(&request.source, &self.settings.grid))
    }

    /// Operator chain for one request, without the leading `-O`
    pub fn operator_args(&self, request: &RegridRequest, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![format!(
            "{},{}",
            self.settings.method_for(request.realm),
            self.settings.grid
        )
        .into()];

        if !request.time_invariant {
            let preprocess = match request.period {
                Period::Mean => "-timmean".to_string(),
                Period::TimeSeries => format!("-seltimestep,{}", LAST_YEAR_TIMESTEPS),
            };
            args.push(preprocess.into());
        }

        args.push(request.source.clone().into_os_string());
        args.push(output.as_os_str().to_os_string());
        args
    }

    /// Regrid `request.source` into `output`, regardless of any cached file.
    pub async fn regrid_into(&self, request: &RegridRequest, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let args = self.operator_args(request, output);
        if let Err(e) = self.run_operator(&args).await {
            // never leave a partial file behind for the cache to pick up
            let _ = std::fs::remove_file(output);
            return Err(e);
        }

        if !output.is_file() {
            return Err(DeepMipError::tool(
                self.settings.tool_name(),
                format!("no output file written to {}", output.display()),
            ));
        }

        Ok(())
    }

    /// Run the tool with `-O` (overwrite) followed by `args`.
    pub async fn run_operator(&self, args: &[OsString]) -> Result<Output> {
        let tool = self.settings.tool_name();

        let mut cmd = Command::new(&self.settings.tool);
        cmd.arg("-O")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            "Running: {} -O {}",
            self.settings.tool.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let child = cmd
            .spawn()
            .map_err(|e| DeepMipError::tool(&tool, format!("failed to start: {}", e)))?;

        let output = match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    DeepMipError::tool(&tool, format!("timed out after {:?}, killed", limit))
                })??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no diagnostic output")
                .trim()
                .to_string();
            return Err(DeepMipError::tool(
                tool,
                format!(
                    "exit code {}: {}",
                    output.status.code().unwrap_or(-1),
                    message
                ),
            ));
        }

        Ok(output)
    }
}

#[async_trait]
impl Regridder for CdoRegridder {
    async fn regrid(&self, request: &RegridRequest) -> Result<PathBuf> {
        let output = self.output_path(request);

        if !self.settings.force && output.is_file() {
            tracing::debug!(output = %output.display(), "reusing regridded file");
            return Ok(output);
        }

        self.regrid_into(request, &output).await?;
        Ok(output)
    }
}

/// `tas_X_Y_v1.0.mean.nc` on grid `r180x90` becomes `tas_X_Y_v1.0.mean.r180x90.nc`
pub fn regridded_file_name(source: &Path, grid: &str) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".nc").unwrap_or(&name);
    format!("{stem}.{grid}.nc")
}
