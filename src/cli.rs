//! Defines command-line interface options using `clap` for deepmip-check.

use crate::bulk_regrid::DEFAULT_VARIABLES;
use crate::config::{
    RegridSettings, RunConfig, DEFAULT_BULK_GRID, DEFAULT_DATA_ROOT, DEFAULT_GRID, DEFAULT_METHOD, DEFAULT_TOOL,
    DEFAULT_TOOL_TIMEOUT_SECS,
};
use crate::naming::Period;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Consistency checks and regridding for the DeepMIP-Eocene model database
#[derive(Parser, Debug)]
#[command(
    version,
    name = "deepmip-check",
    about = "Consistency-check tables for DeepMIP paleoclimate model output"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Table options when no subcommand is given
    #[command(flatten)]
    pub tables: TableArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regrid, aggregate and tabulate every model run (default)
    Tables(TableArgs),
    /// Regrid a list of variables for every model and experiment
    Regrid(RegridArgs),
}

/// Options shared by all commands
#[derive(ClapArgs, Debug, Clone)]
pub struct CommonArgs {
    /// Root directory of the DeepMIP database
    #[arg(long, global = true, default_value = DEFAULT_DATA_ROOT)]
    pub data_root: PathBuf,

    /// Target grid of the regridding tool. Defaults to r180x90 for tables and r360x180 for regrid
    #[arg(long, global = true)]
    pub grid: Option<String>,

    /// Path or name of the cdo binary
    #[arg(long, global = true, default_value = DEFAULT_TOOL)]
    pub cdo: PathBuf,

    /// Directory with models.json, experiments.json and variables.json instead of the built-in dictionaries
    #[arg(long, global = true)]
    pub dictionaries: Option<PathBuf>,

    /// Number of threads to use for reductions. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Seconds before a cdo invocation is killed; 0 disables the limit
    #[arg(long, global = true, default_value_t = DEFAULT_TOOL_TIMEOUT_SECS)]
    pub tool_timeout: u64,

    /// Regrid even when a regridded file already exists
    #[arg(long, global = true, default_value_t = false)]
    pub force: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Only print the summary
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TableArgs {
    /// Restrict to an experiment (repeatable)
    #[arg(long = "experiment")]
    pub experiments: Vec<String>,

    /// Restrict to a variable (repeatable)
    #[arg(long = "variable")]
    pub variables: Vec<String>,

    /// Period to check: mean or time-series (repeatable)
    #[arg(long = "period", value_parser = parse_period)]
    pub periods: Vec<Period>,

    /// Separate tables for atmosphere and ocean variables
    #[arg(long, default_value_t = false)]
    pub split_realms: bool,

    /// Concurrent work units. Defaults to the number of threads.
    #[arg(short, long)]
    pub workers: Option<usize>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RegridArgs {
    /// Comma-separated variables to regrid
    #[arg(long, value_delimiter = ',', default_values = DEFAULT_VARIABLES)]
    pub variables: Vec<String>,

    /// Interpolation method for atmosphere variables
    #[arg(long, default_value = DEFAULT_METHOD)]
    pub atm_method: String,

    /// Interpolation method for ocean variables
    #[arg(long, default_value = "remapnn")]
    pub ocn_method: String,

    /// Output directory. Defaults to <data-root>/regridded_fields
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Concurrent cdo invocations. Defaults to the number of threads.
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl Args {
    /// Table options from the subcommand, or the top level when none was given
    pub fn table_args(&self) -> &TableArgs {
        match &self.command {
            Some(Command::Tables(args)) => args,
            _ => &self.tables,
        }
    }

    /// Run configuration of the table command
    pub fn run_config(&self, default_workers: usize) -> RunConfig {
        let tables = self.table_args();
        let mut config = RunConfig::new(&self.common.data_root);
        config.experiments = tables.experiments.clone();
        config.variables = tables.variables.clone();
        if !tables.periods.is_empty() {
            config.periods = tables.periods.clone();
        }
        config.split_realms = tables.split_realms;
        config.workers = tables.workers.unwrap_or(default_workers);
        config.quiet = self.common.quiet;
        self.apply_common(&mut config.regrid, DEFAULT_GRID);
        config
    }

    /// Settings of the regrid command
    pub fn bulk_settings(&self, args: &RegridArgs) -> RegridSettings {
        let out_dir = args
            .out_dir
            .clone()
            .unwrap_or_else(|| self.common.data_root.join("regridded_fields"));
        let mut settings = RegridSettings::new(out_dir);
        settings.atmos_method = args.atm_method.clone();
        settings.ocean_method = args.ocn_method.clone();
        self.apply_common(&mut settings, DEFAULT_BULK_GRID);
        settings
    }

    fn apply_common(&self, settings: &mut RegridSettings, default_grid: &str) {
        settings.tool = self.common.cdo.clone();
        settings.grid = self
            .common
            .grid
            .clone()
            .unwrap_or_else(|| default_grid.to_string());
        settings.force = self.common.force;
        settings.timeout = match self.common.tool_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
    }
}

fn parse_period(s: &str) -> Result<Period, String> {
    s.parse()
}
