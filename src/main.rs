//! Entry point for deepmip-check.
//! Handles CLI parsing, dictionary loading, and dispatches the table or regrid command.

use chrono::Local;
use clap::Parser;
use deepmip_check::bulk_regrid::regrid_all;
use deepmip_check::cli::{Args, Command};
use deepmip_check::logging::init_tracing;
use deepmip_check::parallel::get_parallel_info;
use deepmip_check::prelude::*;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.common.verbose);

    if !args.common.quiet {
        println!(
            r#"
------------------------------------------------------------------
     ____                 __  __ ___ ____        _               _
    |  _ \  ___  ___ _ __|  \/  |_ _|  _ \   ___| |__   ___  ___| | __
    | | | |/ _ \/ _ \ '_ \ |\/| || || |_) | / __| '_ \ / _ \/ __| |/ /
    | |_| |  __/  __/ |_) | |  | || ||  __/ | (__| | | |  __/ (__|   <
    |____/ \___|\___| .__/|_|  |_|___|_|     \___|_| |_|\___|\___|_|\_\
                    |_|   DeepMIP consistency checks
------------------------------------------------------------------
"#
        );
    }

    match execute(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: &Args) -> Result<()> {
    let parallel = ParallelConfig::new(args.common.threads);
    parallel.setup_global_pool()?;

    let dicts = match &args.common.dictionaries {
        Some(dir) => Dictionaries::from_dir(dir)?,
        None => Dictionaries::deepmip_eocene()?,
    };
    let started = Local::now();

    match &args.command {
        Some(Command::Regrid(regrid)) => {
            let settings = args.bulk_settings(regrid);
            if !args.common.data_root.is_dir() {
                return Err(DeepMipError::Configuration(format!(
                    "required directory {} not found",
                    args.common.data_root.display()
                )));
            }
            if !settings.tool_available() {
                return Err(DeepMipError::Configuration(format!(
                    "{} could not be found. Please install CDO.",
                    settings.tool.display()
                )));
            }

            println!(
                "🚀 Regridding {} to {} into {}",
                regrid.variables.join(", "),
                settings.grid,
                settings.output_dir.display()
            );
            let workers = regrid.workers.unwrap_or_else(|| parallel.default_workers());
            let regridder = CdoRegridder::new(settings);
            let summary = regrid_all(
                &dicts,
                &args.common.data_root,
                &regrid.variables,
                &regridder,
                workers,
            )
            .await?;
            summary.print_info();
        }
        _ => {
            let config = args.run_config(parallel.default_workers());
            config.check_requirements()?;
            let plan = plan(&dicts, &config)?;

            if !config.quiet {
                get_parallel_info().print_info(config.workers);
            }
            println!(
                "🚀 Checking {} work units in {} tables (started {})",
                plan.len(),
                plan.tables.len(),
                started.format("%Y-%m-%d %H:%M:%S")
            );

            let regridder: Arc<dyn Regridder> = Arc::new(CdoRegridder::new(config.regrid.clone()));
            let tables_dir = config.tables_dir.clone();
            let summary = run(plan, Arc::new(dicts), Arc::new(config), regridder).await?;
            summary.print_info();
            println!("✅ Saved tables to {}", tables_dir.display());
        }
    }

    println!(
        "✅ Finished at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}
