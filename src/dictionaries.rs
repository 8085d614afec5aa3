//! DeepMIP reference dictionaries: models, experiments and variables
//!
//! The dictionaries are loaded once at start-up, validated, and then shared
//! read-only (behind an `Arc`) by every component of a run. The DeepMIP-Eocene
//! phase 1 ensemble is embedded in the binary; other ensembles can be loaded
//! from a directory holding `models.json`, `experiments.json` and
//! `variables.json` in the same layout.

use crate::errors::{DeepMipError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

const EOCENE_MODELS: &str = include_str!("../dictionaries/models.json");
const EOCENE_EXPERIMENTS: &str = include_str!("../dictionaries/experiments.json");
const EOCENE_VARIABLES: &str = include_str!("../dictionaries/variables.json");

/// Model component a variable belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    Atmos,
    Ocean,
}

impl Realm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Atmos => "atmos",
            Self::Ocean => "ocean",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participating model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Data set version, part of both the directory tree and the file name
    pub version: String,
    /// Model family; the first directory level below the data root
    pub family: String,
    /// Short label used in tables
    pub abbrv: String,
    /// Experiments this model has submitted
    pub experiments: Vec<String>,
    /// Reported global mean surface temperature per experiment, in `experiments` order
    #[serde(default)]
    pub gmst: Vec<f64>,
    #[serde(default)]
    pub rotation: Option<String>,
    #[serde(default)]
    pub cmip_generation: Option<String>,
}

impl ModelRecord {
    /// Whether the model lists `experiment` among its submitted runs
    pub fn ran(&self, experiment: &str) -> bool {
        self.experiments.iter().any(|e| e == experiment)
    }

    /// Reported GMST for `experiment`, if the model published one
    pub fn reported_gmst(&self, experiment: &str) -> Option<f64> {
        let idx = self.experiments.iter().position(|e| e == experiment)?;
        self.gmst.get(idx).copied()
    }
}

/// One experiment of the protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub long_name: String,
    pub medium_name: String,
    pub short_name: String,
    /// Atmospheric CO2 in ppmv
    pub co2: u32,
}

/// Scale factor and unit used when a variable is shown in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConversion {
    pub factor: f64,
    pub unit: String,
}

/// One output variable following the CMIP6 data request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub long_name: String,
    /// Unit of the stored data
    pub unit: String,
    /// 2 = time-invariant boundary condition, 3 = time/lat/lon, 4 = with a vertical axis
    pub dimensions: usize,
    pub realm: Realm,
    /// Plausible range of global mean/min/max, in the stored unit
    #[serde(default)]
    pub valid_range: Option<(f64, f64)>,
    #[serde(default)]
    pub display: Option<DisplayConversion>,
}

impl VariableRecord {
    /// Time-invariant fields carry no time axis and no period in their file name
    pub fn is_boundary_condition(&self) -> bool {
        self.dimensions <= 2
    }

    pub fn has_vertical_axis(&self) -> bool {
        self.dimensions == 4
    }

    pub fn display_factor(&self) -> f64 {
        self.display.as_ref().map_or(1.0, |d| d.factor)
    }

    pub fn display_unit(&self) -> &str {
        self.display.as_ref().map_or(self.unit.as_str(), |d| d.unit.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct VariableFile {
    #[serde(default)]
    excluded_from_tables: Vec<String>,
    variables: BTreeMap<String, VariableRecord>,
}

/// The immutable reference data for one ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionaries {
    pub models: BTreeMap<String, ModelRecord>,
    pub experiments: BTreeMap<String, ExperimentRecord>,
    pub variables: BTreeMap<String, VariableRecord>,
    /// Variables that exist in the data request but are never tabulated
    pub excluded_from_tables: Vec<String>,
}

impl Dictionaries {
    /// Build and validate dictionaries from already parsed records
    pub fn new(
        models: BTreeMap<String, ModelRecord>,
        experiments: BTreeMap<String, ExperimentRecord>,
        variables: BTreeMap<String, VariableRecord>,
        excluded_from_tables: Vec<String>,
    ) -> Result<Self> {
        let dicts = Self {
            models,
            experiments,
            variables,
            excluded_from_tables,
        };
        dicts.validate()?;
        Ok(dicts)
    }

    /// The DeepMIP-Eocene phase 1 ensemble shipped with the crate
    pub fn deepmip_eocene() -> Result<Self> {
        Self::from_json_strs(EOCENE_MODELS, EOCENE_EXPERIMENTS, EOCENE_VARIABLES)
    }

    /// Load `models.json`, `experiments.json` and `variables.json` from `dir`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|e| {
                DeepMipError::Configuration(format!(
                    "cannot read dictionary {}: {}",
                    path.display(),
                    e
                ))
            })
        };
        Self::from_json_strs(
            &read("models.json")?,
            &read("experiments.json")?,
            &read("variables.json")?,
        )
    }

    pub fn from_json_strs(models: &str, experiments: &str, variables: &str) -> Result<Self> {
        let models: BTreeMap<String, ModelRecord> = parse("models", models)?;
        let experiments: BTreeMap<String, ExperimentRecord> = parse("experiments", experiments)?;
        let variables: VariableFile = parse("variables", variables)?;
        Self::new(
            models,
            experiments,
            variables.variables,
            variables.excluded_from_tables,
        )
    }

    pub fn model(&self, key: &str) -> Option<&ModelRecord> {
        self.models.get(key)
    }

    pub fn experiment(&self, key: &str) -> Option<&ExperimentRecord> {
        self.experiments.get(key)
    }

    pub fn variable(&self, key: &str) -> Option<&VariableRecord> {
        self.variables.get(key)
    }

    /// Variables that appear in overview tables, optionally restricted to one realm
    pub fn table_variables(
        &self,
        realm: Option<Realm>,
    ) -> impl Iterator<Item = (&String, &VariableRecord)> + '_ {
        self.variables.iter().filter(move |(key, var)| {
            !self.excluded_from_tables.iter().any(|e| e == *key)
                && realm.map_or(true, |r| var.realm == r)
        })
    }

    fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(DeepMipError::Configuration("model dictionary is empty".into()));
        }
        if self.experiments.is_empty() {
            return Err(DeepMipError::Configuration(
                "experiment dictionary is empty".into(),
            ));
        }
        if self.variables.is_empty() {
            return Err(DeepMipError::Configuration(
                "variable dictionary is empty".into(),
            ));
        }

        for (key, model) in &self.models {
            if let Some(unknown) = model
                .experiments
                .iter()
                .find(|e| !self.experiments.contains_key(*e))
            {
                return Err(DeepMipError::Configuration(format!(
                    "model '{}' lists unknown experiment '{}'",
                    key, unknown
                )));
            }
            if !model.gmst.is_empty() && model.gmst.len() != model.experiments.len() {
                tracing::warn!(
                    model = %key,
                    "GMST list has {} entries for {} experiments",
                    model.gmst.len(),
                    model.experiments.len()
                );
            }
        }

        for (key, var) in &self.variables {
            if !(2..=4).contains(&var.dimensions) {
                return Err(DeepMipError::Configuration(format!(
                    "variable '{}' has unsupported dimension count {}",
                    key, var.dimensions
                )));
            }
            if let Some((lo, hi)) = var.valid_range {
                if lo > hi {
                    return Err(DeepMipError::Configuration(format!(
                        "variable '{}' has an empty valid range [{}, {}]",
                        key, lo, hi
                    )));
                }
            }
        }

        Ok(())
    }
}

fn parse<T: serde::de::DeserializeOwned>(what: &str, json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| {
        DeepMipError::Configuration(format!("cannot parse {} dictionary: {}", what, e))
    })
}
