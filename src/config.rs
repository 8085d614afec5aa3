//! Run configuration
//!
//! `RunConfig` is built once from the command line (or directly by library
//! users and tests) and is read-only afterwards.

use crate::dictionaries::Realm;
use crate::errors::{DeepMipError, Result};
use crate::naming::Period;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATA_ROOT: &str = "/data/deepmip-eocene-p1";
pub const DEFAULT_GRID: &str = "r180x90";
/// Target grid of the `regrid` command
pub const DEFAULT_BULK_GRID: &str = "r360x180";
pub const DEFAULT_METHOD: &str = "remapbil";
pub const DEFAULT_TOOL: &str = "cdo";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;

/// Tables and regridded data are written below this directory of the data root
pub const TABLES_SUBDIR: &str = "validation_tables";
const REGRID_SUBDIR: &str = "data";

/// How and where the external tool regrids files
#[derive(Debug, Clone)]
pub struct RegridSettings {
    /// Binary name or path of the regridding tool
    pub tool: PathBuf,
    /// Target grid descriptor, e.g. `r180x90`
    pub grid: String,
    pub atmos_method: String,
    pub ocean_method: String,
    /// Per-invocation limit; the child is killed when it expires
    pub timeout: Option<Duration>,
    pub output_dir: PathBuf,
    /// Regrid even when a cached output file exists
    pub force: bool,
}

impl RegridSettings {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool: PathBuf::from(DEFAULT_TOOL),
            grid: DEFAULT_GRID.to_string(),
            atmos_method: DEFAULT_METHOD.to_string(),
            ocean_method: DEFAULT_METHOD.to_string(),
            timeout: Some(Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS)),
            output_dir: output_dir.into(),
            force: false,
        }
    }

    /// Interpolation operator used for variables of `realm`
    pub fn method_for(&self, realm: Realm) -> &str {
        match realm {
            Realm::Atmos => &self.atmos_method,
            Realm::Ocean => &self.ocean_method,
        }
    }

    /// Display name of the tool for messages
    pub fn tool_name(&self) -> String {
        self.tool
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.tool.display().to_string())
    }

    /// Whether the tool can be found, either as a path or on `PATH`
    pub fn tool_available(&self) -> bool {
        if self.tool.components().count() > 1 {
            return self.tool.is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(&self.tool).is_file()))
            .unwrap_or(false)
    }
}

/// Configuration of one table-generation run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_root: PathBuf,
    pub tables_dir: PathBuf,
    /// Restrict to these experiments; empty means all
    pub experiments: Vec<String>,
    /// Restrict to these variables; empty means every tabulated variable
    pub variables: Vec<String>,
    pub periods: Vec<Period>,
    /// Write separate atmosphere and ocean tables
    pub split_realms: bool,
    /// Number of concurrent work-unit workers
    pub workers: usize,
    /// Suppress per-unit progress lines
    pub quiet: bool,
    pub regrid: RegridSettings,
}

impl RunConfig {
    /// Defaults for a data root: tables and regridded files below `<root>/validation_tables`
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        let tables_dir = data_root.join(TABLES_SUBDIR);
        let regrid = RegridSettings::new(tables_dir.join(REGRID_SUBDIR));
        Self {
            data_root,
            tables_dir,
            experiments: Vec::new(),
            variables: Vec::new(),
            periods: vec![Period::Mean],
            split_realms: false,
            workers: num_cpus::get(),
            quiet: false,
            regrid,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(DeepMipError::Configuration(
                "at least one worker is required".into(),
            ));
        }
        if self.periods.is_empty() {
            return Err(DeepMipError::Configuration(
                "at least one period must be selected".into(),
            ));
        }
        if self.regrid.grid.trim().is_empty() {
            return Err(DeepMipError::Configuration(
                "target grid must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Environment checks that must pass before any work is enumerated
    pub fn check_requirements(&self) -> Result<()> {
        ensure_dir(&self.data_root)?;
        if !self.regrid.tool.as_os_str().is_empty() && !self.regrid.tool_available() {
            tracing::warn!(
                tool = %self.regrid.tool.display(),
                "regridding tool not found; every existing file will be reported as failed"
            );
        }
        Ok(())
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DeepMipError::Configuration(format!(
            "required directory {} not found",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_data_root() {
        let config = RunConfig::new("/db");
        assert_eq!(config.tables_dir, Path::new("/db/validation_tables"));
        assert_eq!(config.regrid.output_dir, Path::new("/db/validation_tables/data"));
        assert_eq!(config.periods, vec![Period::Mean]);
        assert_eq!(config.regrid.grid, "r180x90");
        assert!(config.workers > 0);
        config.validate().unwrap();
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut config = RunConfig::new("/db");
        config.workers = 0;
        assert!(config.validate().unwrap_err().is_fatal());
    }

    #[test]
    fn missing_data_root_is_fatal() {
        let config = RunConfig::new("/definitely/not/here");
        assert!(config.check_requirements().unwrap_err().is_fatal());
    }

    #[test]
    fn method_per_realm() {
        let mut settings = RegridSettings::new("/tmp");
        settings.ocean_method = "remapnn".into();
        assert_eq!(settings.method_for(Realm::Atmos), "remapbil");
        assert_eq!(settings.method_for(Realm::Ocean), "remapnn");
        assert_eq!(settings.tool_name(), "cdo");
    }
}
