//! Overview tables: one per experiment (and period, optionally realm)
//!
//! A [`TableBuilder`] collects the outcome of every work unit of its table
//! and, once all of them have reported, produces an [`OverviewTable`] with
//! display units applied, ensemble medians and per-value z-scores. Rows are
//! sorted by (variable, model) so the written files do not depend on the
//! order in which units finished.

use crate::dictionaries::{Dictionaries, Realm};
use crate::errors::{DeepMipError, Result};
use crate::naming::Period;
use crate::sanity::{SanityReport, ValidRange};
use crate::statistics::ensemble::{abs_z_scores, is_outlier, nan_median};
use crate::statistics::{AggregateResult, FieldStats, StatOperation};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

const TSV_HEADER: [&str; 9] = [
    "variable", "model", "realm", "unit", "min", "mean", "max", "max_abs_z", "note",
];

/// Identifies one overview table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey {
    pub experiment: String,
    pub period: Period,
    /// Set when atmosphere and ocean variables get separate tables
    pub realm: Option<Realm>,
}

impl TableKey {
    pub fn title(&self) -> String {
        match self.realm {
            Some(realm) => format!("{} {} {}", self.experiment, realm, self.period),
            None => format!("{} {}", self.experiment, self.period),
        }
    }

    /// File name without extension
    pub fn file_stem(&self) -> String {
        format!("{}_validation_table", self.title().replace(' ', "_"))
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

/// What happened to one work unit
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    /// Aggregated values plus the range check verdict
    Value {
        result: AggregateResult,
        sanity: SanityReport,
    },
    /// The source file does not exist
    Missing,
    /// The external tool failed
    Failed(String),
    /// The regridded file could not be aggregated
    Invalid(String),
}

impl CellOutcome {
    /// Convert a per-unit error into the cell it produces
    pub fn from_error(error: &DeepMipError) -> Self {
        match error {
            DeepMipError::MissingFile(_) => CellOutcome::Missing,
            DeepMipError::ExternalTool { .. } => CellOutcome::Failed(error.to_string()),
            _ => CellOutcome::Invalid(error.to_string()),
        }
    }

    pub fn status(&self) -> RowStatus {
        match self {
            CellOutcome::Value { sanity, .. } if sanity.passed => RowStatus::Ok,
            CellOutcome::Value { .. } => RowStatus::Anomaly,
            CellOutcome::Missing => RowStatus::Missing,
            CellOutcome::Failed(_) => RowStatus::Failed,
            CellOutcome::Invalid(_) => RowStatus::Invalid,
        }
    }
}

/// Final state of a table row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Ok,
    Anomaly,
    Missing,
    Failed,
    Invalid,
}

impl RowStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Anomaly => "anomaly",
            Self::Missing => "missing",
            Self::Failed => "failed",
            Self::Invalid => "invalid",
        }
    }

    pub const fn has_values(self) -> bool {
        matches!(self, Self::Ok | Self::Anomaly)
    }
}

/// Number of rows per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub ok: usize,
    pub anomaly: usize,
    pub missing: usize,
    pub failed: usize,
    pub invalid: usize,
}

impl OutcomeCounts {
    pub fn add(&mut self, status: RowStatus) {
        match status {
            RowStatus::Ok => self.ok += 1,
            RowStatus::Anomaly => self.anomaly += 1,
            RowStatus::Missing => self.missing += 1,
            RowStatus::Failed => self.failed += 1,
            RowStatus::Invalid => self.invalid += 1,
        }
    }

    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.ok += other.ok;
        self.anomaly += other.anomaly;
        self.missing += other.missing;
        self.failed += other.failed;
        self.invalid += other.invalid;
    }

    pub fn total(&self) -> usize {
        self.ok + self.anomaly + self.missing + self.failed + self.invalid
    }
}

/// One (variable, model) row of an overview table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub variable: String,
    pub model: String,
    pub abbrv: String,
    pub realm: Option<Realm>,
    /// Unit after display conversion
    pub unit: String,
    pub status: RowStatus,
    /// Statistics in display units
    pub stats: Option<FieldStats>,
    /// |z-score| of min, mean and max against the ensemble
    pub z_scores: [f64; 3],
    /// Flag per statistic (min, mean, max)
    pub flagged: [bool; 3],
    pub note: Option<String>,
}

impl TableRow {
    /// Largest finite |z-score| of the row
    pub fn max_abs_z(&self) -> Option<f64> {
        self.z_scores
            .iter()
            .copied()
            .filter(|z| z.is_finite())
            .fold(None, |acc: Option<f64>, z| Some(acc.map_or(z, |a| a.max(z))))
    }

    /// Text of one statistic cell
    pub fn cell(&self, op: StatOperation) -> String {
        let idx = stat_index(op);
        match (&self.stats, self.status) {
            (Some(stats), status) if status.has_values() => {
                let marker = if self.flagged[idx] { "!" } else { "" };
                format!("{:.3}{}", stats.get(op), marker)
            }
            (_, status) => status.as_str().to_string(),
        }
    }
}

/// Accumulates the outcomes of one table's work units
#[derive(Debug)]
pub struct TableBuilder {
    key: TableKey,
    expected: usize,
    reported: usize,
    cells: BTreeMap<(String, String), CellOutcome>,
}

impl TableBuilder {
    pub fn new(key: TableKey, expected: usize) -> Self {
        Self {
            key,
            expected,
            reported: 0,
            cells: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &TableKey {
        &self.key
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn record(&mut self, variable: &str, model: &str, outcome: CellOutcome) {
        self.reported += 1;
        if self
            .cells
            .insert((variable.to_string(), model.to_string()), outcome)
            .is_some()
        {
            tracing::warn!(table = %self.key, variable, model, "cell reported twice");
        }
    }

    /// Every expected unit has reported success, skip or failure
    pub fn is_complete(&self) -> bool {
        self.reported >= self.expected
    }

    /// Build the final table: convert units, compute ensemble statistics, sort rows.
    pub fn finish(self, dicts: &Dictionaries) -> OverviewTable {
        let title = self.key.title();
        let mut rows: Vec<TableRow> = Vec::with_capacity(self.cells.len());
        let mut raw: Vec<Option<FieldStats>> = Vec::with_capacity(self.cells.len());

        for ((variable, model), outcome) in self.cells {
            let var_info = dicts.variable(&variable);
            let status = outcome.status();
            let (stats, note) = match outcome {
                CellOutcome::Value { result, sanity } => (Some(result.stats), sanity.warning),
                CellOutcome::Missing => (None, None),
                CellOutcome::Failed(msg) | CellOutcome::Invalid(msg) => (None, Some(msg)),
            };
            raw.push(stats);

            let factor = var_info.map_or(1.0, |v| v.display_factor());
            rows.push(TableRow {
                abbrv: dicts
                    .model(&model)
                    .map_or_else(|| model.clone(), |m| m.abbrv.clone()),
                realm: var_info.map(|v| v.realm),
                unit: var_info.map_or_else(String::new, |v| v.display_unit().to_string()),
                status,
                stats: stats.map(|s| s.scaled(factor)),
                z_scores: [f64::NAN; 3],
                flagged: [false; 3],
                note,
                variable,
                model,
            });
        }

        // rows are already sorted by (variable, model) through the BTreeMap
        let mut ensemble = BTreeMap::new();
        let mut start = 0;
        while start < rows.len() {
            let variable = rows[start].variable.clone();
            let end = start
                + rows[start..]
                    .iter()
                    .take_while(|r| r.variable == variable)
                    .count();
            let range = dicts.variable(&variable).and_then(ValidRange::for_variable);

            let mut medians = [None; 3];
            for op in StatOperation::ALL {
                let idx = stat_index(op);
                let values: Vec<f64> = rows[start..end]
                    .iter()
                    .map(|r| r.stats.map_or(f64::NAN, |s| s.get(op)))
                    .collect();
                medians[idx] = nan_median(&values);

                for (offset, z) in abs_z_scores(&values).into_iter().enumerate() {
                    let row = &mut rows[start + offset];
                    row.z_scores[idx] = z;
                    let out_of_range = match (range, raw[start + offset]) {
                        (Some(r), Some(s)) => !r.contains(s.get(op)),
                        _ => false,
                    };
                    row.flagged[idx] = row.status.has_values() && (out_of_range || is_outlier(z));
                }
            }

            for row in &mut rows[start..end] {
                if row.status == RowStatus::Ok && row.flagged.iter().any(|f| *f) {
                    row.status = RowStatus::Anomaly;
                    if let Some(z) = row.max_abs_z() {
                        row.note = Some(format!("|z| = {:.2} against ensemble median", z));
                    }
                }
            }

            ensemble.insert(variable, EnsembleMedians::from(medians));
            start = end;
        }

        let reported_gmst = rows
            .iter()
            .filter_map(|r| {
                let gmst = dicts.model(&r.model)?.reported_gmst(&self.key.experiment)?;
                Some((r.model.clone(), gmst))
            })
            .collect();

        OverviewTable {
            reported_gmst,
            experiment: self.key.experiment.clone(),
            period: self.key.period.as_str().to_string(),
            realm: self.key.realm,
            title,
            rows,
            ensemble,
            key: self.key,
        }
    }
}

/// Median of each statistic across the models of one variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnsembleMedians {
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
}

impl From<[Option<f64>; 3]> for EnsembleMedians {
    fn from(m: [Option<f64>; 3]) -> Self {
        Self {
            min: m[0],
            mean: m[1],
            max: m[2],
        }
    }
}

/// Completed overview table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewTable {
    #[serde(skip)]
    pub key: TableKey,
    pub experiment: String,
    pub period: String,
    pub realm: Option<Realm>,
    pub title: String,
    pub rows: Vec<TableRow>,
    /// Per-variable ensemble medians in display units
    pub ensemble: BTreeMap<String, EnsembleMedians>,
    /// Global mean surface temperature (degC) each model published for this experiment
    pub reported_gmst: BTreeMap<String, f64>,
}

impl OverviewTable {
    pub fn row(&self, variable: &str, model: &str) -> Option<&TableRow> {
        self.rows
            .iter()
            .find(|r| r.variable == variable && r.model == model)
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for row in &self.rows {
            counts.add(row.status);
        }
        counts
    }

    /// Tab-separated rendering, one line per row after a title comment and header
    pub fn to_tsv(&self) -> String {
        let mut out = format!("# {} validation table\n", self.title);
        out.push_str(&TSV_HEADER.join("\t"));
        out.push('\n');

        for row in &self.rows {
            let fields = [
                row.variable.clone(),
                row.model.clone(),
                row.realm.map_or_else(String::new, |r| r.to_string()),
                row.unit.clone(),
                row.cell(StatOperation::Min),
                row.cell(StatOperation::Mean),
                row.cell(StatOperation::Max),
                row.max_abs_z()
                    .map_or_else(|| "-".to_string(), |z| format!("{:.2}", z)),
                row.note.as_deref().map(sanitize).unwrap_or_default(),
            ];
            out.push_str(&fields.join("\t"));
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write `<stem>.tsv` and `<stem>.json` into `dir`
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let stem = self.key.file_stem();

        let tsv = dir.join(format!("{stem}.tsv"));
        std::fs::write(&tsv, self.to_tsv())?;

        let json = dir.join(format!("{stem}.json"));
        let mut body = self.to_json()?;
        body.push('\n');
        std::fs::write(&json, body)?;

        Ok(vec![tsv, json])
    }
}

const fn stat_index(op: StatOperation) -> usize {
    match op {
        StatOperation::Min => 0,
        StatOperation::Mean => 1,
        StatOperation::Max => 2,
    }
}

fn sanitize(note: &str) -> String {
    note.replace(['\t', '\n', '\r'], " ")
}
