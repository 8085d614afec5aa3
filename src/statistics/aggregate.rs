//! Global aggregation of one regridded file
//!
//! Checks the file against the dictionary definition of its variable,
//! reduces 4-D fields to a single vertical level and computes the
//! area-weighted global mean together with the global minimum and maximum.

use super::levels::{choose_level, LevelSelection};
use super::operations::FieldStats;
use super::parallel::{latitude_weights, parallel_field_stats};
use crate::dictionaries::VariableRecord;
use crate::errors::{DeepMipError, Result};
use crate::netcdf_io::{
    coordinate_units, coordinate_values, dimension_names, find_axis, open_dataset,
    read_masked_field, AxisKind,
};
use ndarray::Axis;
use serde::Serialize;
use std::path::Path;

/// Climatologies hold either one annual mean or twelve monthly means
pub const ALLOWED_TIMESTEPS: [usize; 2] = [1, 12];

/// Aggregated statistics of one work unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub stats: FieldStats,
    /// Length of the time axis, absent for boundary conditions
    pub timesteps: Option<usize>,
    /// Vertical level the statistics refer to, for 4-D variables
    pub level: Option<LevelSelection>,
}

/// Compute global statistics of `var_key` in the regridded file at `path`.
///
/// # Errors
///
/// Returns [`DeepMipError::Data`] when the file cannot be opened, the
/// variable is absent, its rank or time axis do not match the dictionary,
/// no vertical level can be chosen, or the field holds no finite value.
pub fn aggregate_file(
    path: &Path,
    var_key: &str,
    variable: &VariableRecord,
) -> Result<AggregateResult> {
    let file = open_dataset(path)?;
    let var = file
        .variable(var_key)
        .ok_or_else(|| DeepMipError::data(path, format!("variable '{}' not found", var_key)))?;

    let dims = dimension_names(&var);
    if dims.len() != variable.dimensions {
        return Err(DeepMipError::data(
            path,
            format!(
                "{} has {} dimensions, but should have {}",
                var_key,
                dims.len(),
                variable.dimensions
            ),
        ));
    }

    let timesteps = if variable.is_boundary_condition() {
        None
    } else {
        let t = find_axis(&file, &var, AxisKind::Time)
            .ok_or_else(|| DeepMipError::data(path, format!("{} has no time axis", var_key)))?;
        let n = var.dimensions()[t].len();
        if !ALLOWED_TIMESTEPS.contains(&n) {
            return Err(DeepMipError::data(
                path,
                format!("{} has {} timesteps, but should have 1 or 12", var_key, n),
            ));
        }
        Some(n)
    };

    let lat_axis = find_axis(&file, &var, AxisKind::Latitude);
    let lat_dim = lat_axis.map(|a| dims[a].clone());
    let mut data = read_masked_field(&file, path, var_key)?;

    let (level, lat_axis) = if variable.has_vertical_axis() {
        let z = find_axis(&file, &var, AxisKind::Vertical).ok_or_else(|| {
            DeepMipError::data(path, format!("{} has no vertical axis", var_key))
        })?;
        let dim = &dims[z];
        let units = coordinate_units(&file, dim);
        let coords = coordinate_values(&file, dim)?;
        let selection = choose_level(var_key, dim, units.as_deref(), coords.as_deref())
            .map_err(|msg| DeepMipError::data(path, msg))?;

        if selection.index >= data.len_of(Axis(z)) {
            return Err(DeepMipError::data(
                path,
                format!("level index {} outside dimension '{}'", selection.index, dim),
            ));
        }
        data = data.index_axis(Axis(z), selection.index).to_owned();

        let lat_axis = match lat_axis {
            Some(a) if a == z => None,
            Some(a) if a > z => Some(a - 1),
            other => other,
        };
        (Some(selection), lat_axis)
    } else {
        (None, lat_axis)
    };

    let weights = match (lat_axis, &lat_dim) {
        (Some(axis), Some(dim)) => match coordinate_values(&file, dim)? {
            Some(lats) if lats.len() == data.len_of(Axis(axis)) => Some(latitude_weights(&lats)),
            _ => {
                tracing::debug!(file = %path.display(), "latitude coordinate unusable, averaging unweighted");
                None
            }
        },
        _ => None,
    };

    let stats = parallel_field_stats(&data, lat_axis, weights.as_deref())?;
    if stats.valid == 0 {
        return Err(DeepMipError::data(
            path,
            format!("{} holds no finite values", var_key),
        ));
    }

    Ok(AggregateResult {
        stats,
        timesteps,
        level,
    })
}
