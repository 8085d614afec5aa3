//! Work enumeration and the concurrent table pipeline
//!
//! [`plan`] expands the selected experiments, models, variables and periods
//! into [`WorkUnit`]s. [`run`] pushes them through a bounded channel to a
//! fixed number of worker tasks. Workers send one [`CellOutcome`] per unit
//! to a single accumulation task, which owns every [`TableBuilder`] and
//! writes a table as soon as all of its units have reported.

use crate::config::RunConfig;
use crate::dictionaries::{Dictionaries, Realm, VariableRecord};
use crate::errors::{DeepMipError, Result};
use crate::naming::{file_exists, resolve_source_path, Period};
use crate::progress::Progress;
use crate::regrid::{RegridRequest, Regridder};
use crate::sanity::{self, ValidRange};
use crate::statistics::aggregate_file;
use crate::table::{CellOutcome, OutcomeCounts, TableBuilder, TableKey};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// One (experiment, model, variable, period) combination
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    pub table: TableKey,
    pub experiment: String,
    pub model: String,
    pub variable: String,
    pub period: Period,
    pub realm: Realm,
    pub time_invariant: bool,
    pub source: PathBuf,
}

impl WorkUnit {
    pub fn label(&self) -> String {
        format!(
            "{} {} {} {}",
            self.variable, self.model, self.experiment, self.period
        )
    }

    fn regrid_request(&self) -> RegridRequest {
        RegridRequest {
            source: self.source.clone(),
            realm: self.realm,
            period: self.period,
            time_invariant: self.time_invariant,
        }
    }
}

/// Every unit of a run and the number of units per table
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub units: Vec<WorkUnit>,
    pub tables: BTreeMap<TableKey, usize>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Enumerate all work units of a run.
///
/// A model contributes to an experiment only if it ran it. Selected
/// experiment or variable keys absent from the dictionaries are
/// configuration errors, raised before any work is submitted.
pub fn plan(dicts: &Dictionaries, config: &RunConfig) -> Result<Plan> {
    config.validate()?;

    let experiments: Vec<&str> = if config.experiments.is_empty() {
        dicts.experiments.keys().map(String::as_str).collect()
    } else {
        let mut selected = BTreeSet::new();
        for exp in &config.experiments {
            if dicts.experiment(exp).is_none() {
                return Err(DeepMipError::Configuration(format!(
                    "unknown experiment '{}'",
                    exp
                )));
            }
            selected.insert(exp.as_str());
        }
        selected.into_iter().collect()
    };

    let variables: Vec<(&str, &VariableRecord)> = if config.variables.is_empty() {
        dicts
            .table_variables(None)
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    } else {
        let mut selected = BTreeMap::new();
        for key in &config.variables {
            let record = dicts.variable(key).ok_or_else(|| {
                DeepMipError::Configuration(format!("unknown variable '{}'", key))
            })?;
            selected.insert(key.as_str(), record);
        }
        selected.into_iter().collect()
    };

    let periods: BTreeSet<Period> = config.periods.iter().copied().collect();

    let mut plan = Plan::default();
    for experiment in &experiments {
        for period in &periods {
            for (model, record) in dicts.models.iter().filter(|(_, m)| m.ran(experiment)) {
                for (variable, info) in &variables {
                    let source = resolve_source_path(
                        dicts,
                        &config.data_root,
                        experiment,
                        model,
                        variable,
                        *period,
                    )
                    .ok_or_else(|| {
                        DeepMipError::Configuration(format!(
                            "cannot resolve {} for {} {} (version {})",
                            variable, model, experiment, record.version
                        ))
                    })?;

                    let table = TableKey {
                        experiment: experiment.to_string(),
                        period: *period,
                        realm: config.split_realms.then_some(info.realm),
                    };
                    *plan.tables.entry(table.clone()).or_default() += 1;

                    plan.units.push(WorkUnit {
                        table,
                        experiment: experiment.to_string(),
                        model: model.clone(),
                        variable: variable.to_string(),
                        period: *period,
                        realm: info.realm,
                        time_invariant: info.is_boundary_condition(),
                        source,
                    });
                }
            }
        }
    }

    tracing::info!(
        units = plan.units.len(),
        tables = plan.tables.len(),
        "work enumerated"
    );
    Ok(plan)
}

/// Result of a completed run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub units: usize,
    pub counts: OutcomeCounts,
    /// Paths of the written TSV and JSON files
    pub tables: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn print_info(&self) {
        println!("📊 Run summary:");
        println!("   Work units: {}", self.units);
        println!("   ok: {}", self.counts.ok);
        println!("   anomaly: {}", self.counts.anomaly);
        println!("   missing: {}", self.counts.missing);
        println!("   failed: {}", self.counts.failed);
        println!("   invalid: {}", self.counts.invalid);
        println!("   Files written: {}", self.tables.len());
        println!("   Elapsed: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Process every unit of `plan` and write its tables.
///
/// Per-unit errors become table cells; only task failures and table write
/// errors are returned.
pub async fn run(
    plan: Plan,
    dicts: Arc<Dictionaries>,
    config: Arc<RunConfig>,
    regridder: Arc<dyn Regridder>,
) -> Result<RunSummary> {
    let Plan { units, tables } = plan;
    let total = units.len();
    let workers = config.workers.max(1);

    let (work_tx, work_rx) = mpsc::channel::<WorkUnit>(workers * 2);
    let (result_tx, mut result_rx) = mpsc::channel::<(WorkUnit, CellOutcome)>(workers * 2);
    let work_rx = Arc::new(Mutex::new(work_rx));

    let accumulator = {
        let dicts = Arc::clone(&dicts);
        let tables_dir = config.tables_dir.clone();
        let quiet = config.quiet;
        tokio::spawn(async move {
            let mut builders: HashMap<TableKey, TableBuilder> = tables
                .into_iter()
                .map(|(key, expected)| (key.clone(), TableBuilder::new(key, expected)))
                .collect();
            let mut progress = Progress::new(total, quiet);
            let mut summary = RunSummary {
                units: total,
                ..RunSummary::default()
            };
            let mut first_error: Option<DeepMipError> = None;

            while let Some((unit, outcome)) = result_rx.recv().await {
                progress.report(&unit.label(), outcome.status());

                let Some(builder) = builders.get_mut(&unit.table) else {
                    tracing::warn!(table = %unit.table, "result for unplanned table");
                    continue;
                };
                builder.record(&unit.variable, &unit.model, outcome);

                if builder.is_complete() {
                    if let Some(builder) = builders.remove(&unit.table) {
                        write_table(builder, &dicts, &tables_dir, &mut summary, &mut first_error).await;
                    }
                }
            }

            // only reachable with partial tables if a worker died
            for (_, builder) in builders.drain() {
                if builder.reported() > 0 {
                    tracing::warn!(
                        table = %builder.key(),
                        reported = builder.reported(),
                        expected = builder.expected(),
                        "writing incomplete table"
                    );
                    write_table(builder, &dicts, &tables_dir, &mut summary, &mut first_error).await;
                }
            }

            summary.tables.sort();
            summary.elapsed = progress.elapsed();
            match first_error {
                Some(e) => Err(e),
                None => Ok(summary),
            }
        })
    };

    let mut handles = Vec::with_capacity(workers);
    for id in 0..workers {
        let work_rx = Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        let dicts = Arc::clone(&dicts);
        let regridder = Arc::clone(&regridder);
        handles.push(tokio::spawn(async move {
            loop {
                let next = work_rx.lock().await.recv().await;
                let Some(unit) = next else { break };
                let outcome = process_unit(&unit, &dicts, regridder.as_ref()).await;
                if result_tx.send((unit, outcome)).await.is_err() {
                    tracing::error!(worker = id, "result channel closed");
                    break;
                }
            }
            tracing::debug!(worker = id, "worker finished");
        }));
    }
    drop(result_tx);

    for unit in units {
        if work_tx.send(unit).await.is_err() {
            tracing::error!("all workers stopped before the queue was drained");
            break;
        }
    }
    drop(work_tx);

    for handle in handles {
        handle.await?;
    }
    accumulator.await?
}

async fn write_table(
    builder: TableBuilder,
    dicts: &Dictionaries,
    dir: &Path,
    summary: &mut RunSummary,
    first_error: &mut Option<DeepMipError>,
) {
    let table = builder.finish(dicts);
    summary.counts.merge(&table.counts());
    let title = table.title.clone();
    let rows = table.rows.len();

    let dir = dir.to_path_buf();
    let written = match tokio::task::spawn_blocking(move || table.write_to(&dir)).await {
        Ok(result) => result,
        Err(e) => Err(e.into()),
    };
    match written {
        Ok(paths) => {
            tracing::info!(table = %title, rows, "table written");
            summary.tables.extend(paths);
        }
        Err(e) => {
            tracing::error!(table = %title, "failed to write table: {}", e);
            first_error.get_or_insert(e);
        }
    }
}

/// Run one unit end to end; every error becomes a cell outcome.
pub async fn process_unit(
    unit: &WorkUnit,
    dicts: &Dictionaries,
    regridder: &dyn Regridder,
) -> CellOutcome {
    match evaluate(unit, dicts, regridder).await {
        Ok(outcome) => outcome,
        Err(DeepMipError::MissingFile(path)) => {
            tracing::debug!(file = %path.display(), "source file missing");
            CellOutcome::Missing
        }
        Err(e) => {
            tracing::warn!(unit = %unit.label(), "{}", e);
            CellOutcome::from_error(&e)
        }
    }
}

async fn evaluate(
    unit: &WorkUnit,
    dicts: &Dictionaries,
    regridder: &dyn Regridder,
) -> Result<CellOutcome> {
    if !file_exists(&unit.source) {
        return Err(DeepMipError::MissingFile(unit.source.clone()));
    }

    let variable = dicts.variable(&unit.variable).cloned().ok_or_else(|| {
        DeepMipError::Configuration(format!("unknown variable '{}'", unit.variable))
    })?;

    let regridded = regridder.regrid(&unit.regrid_request()).await?;

    let var_key = unit.variable.clone();
    let (result, sanity) = tokio::task::spawn_blocking(move || -> Result<_> {
        let result = aggregate_file(&regridded, &var_key, &variable)?;
        let report = sanity::check(&result, ValidRange::for_variable(&variable));
        Ok((result, report))
    })
    .await??;

    Ok(CellOutcome::Value { result, sanity })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &std::path::Path) -> RunConfig {
        let mut config = RunConfig::new(root);
        config.experiments = vec!["deepmip-eocene-p1-x3".into()];
        config.variables = vec!["tas".into(), "tos".into()];
        config
    }

    #[test]
    fn plan_crosses_models_variables_and_periods() {
        let dicts = Dictionaries::deepmip_eocene().unwrap();
        let mut config = config(std::path::Path::new("/db"));
        config.periods = vec![Period::Mean, Period::TimeSeries];

        let plan = plan(&dicts, &config).unwrap();
        let models = dicts
            .models
            .values()
            .filter(|m| m.ran("deepmip-eocene-p1-x3"))
            .count();
        assert_eq!(plan.len(), models * 2 * 2);
        assert_eq!(plan.tables.len(), 2);
        assert!(plan.units.iter().all(|u| u.source.starts_with("/db")));
    }

    #[test]
    fn split_realms_gives_one_table_per_realm() {
        let dicts = Dictionaries::deepmip_eocene().unwrap();
        let mut config = config(std::path::Path::new("/db"));
        config.split_realms = true;

        let plan = plan(&dicts, &config).unwrap();
        let realms: Vec<Option<Realm>> = plan.tables.keys().map(|k| k.realm).collect();
        assert_eq!(realms, vec![Some(Realm::Atmos), Some(Realm::Ocean)]);
    }

    #[test]
    fn unknown_selection_is_fatal() {
        let dicts = Dictionaries::deepmip_eocene().unwrap();
        let mut config = config(std::path::Path::new("/db"));
        config.variables = vec!["not_a_variable".into()];
        assert!(plan(&dicts, &config).unwrap_err().is_fatal());

        let mut config = RunConfig::new("/db");
        config.experiments = vec!["deepmip-eocene-p9".into()];
        assert!(plan(&dicts, &config).unwrap_err().is_fatal());
    }

    #[test]
    fn missing_source_is_never_failed() {
        let dicts = Dictionaries::deepmip_eocene().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.regrid.tool = PathBuf::from("/nonexistent/cdo");
        let plan = plan(&dicts, &config).unwrap();
        let regridder = crate::regrid::CdoRegridder::new(config.regrid.clone());

        let outcome = tokio_test::block_on(process_unit(&plan.units[0], &dicts, &regridder));
        assert_eq!(outcome, CellOutcome::Missing);
    }
}
