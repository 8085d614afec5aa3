//! NetCDF reading helpers for regridded DeepMIP files
//!
//! Fields are read as `f32` with every fill value replaced by NaN, so that
//! all downstream reductions only have to skip non-finite values.

use crate::errors::{DeepMipError, Result};
use ndarray::ArrayD;
use netcdf::{AttributeValue, File, Variable};
use std::path::Path;

/// Magnitudes at or above this are netCDF/CDO default fill values
const IMPLICIT_FILL_THRESHOLD: f32 = 1.0e30;

/// CF axis designators used to locate coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Time,
    Vertical,
    Latitude,
}

impl AxisKind {
    /// Value of the CF `axis` attribute
    pub const fn cf_axis(self) -> &'static str {
        match self {
            Self::Time => "T",
            Self::Vertical => "Z",
            Self::Latitude => "Y",
        }
    }

    /// Dimension names accepted when no coordinate carries an `axis` attribute
    const fn fallback_names(self) -> &'static [&'static str] {
        match self {
            Self::Time => &["time", "t"],
            Self::Vertical => &["lev", "plev", "level", "depth", "olevel"],
            Self::Latitude => &["lat", "latitude"],
        }
    }
}

/// Open a regridded file, mapping failures to a data error on `path`
pub fn open_dataset(path: &Path) -> Result<File> {
    netcdf::open(path).map_err(|e| DeepMipError::data(path, format!("cannot open: {}", e)))
}

/// Names of the dimensions of `var`, in storage order
pub fn dimension_names(var: &Variable) -> Vec<String> {
    var.dimensions().iter().map(|d| d.name().to_string()).collect()
}

/// Load `var_name` as an array with fill values masked to NaN
pub fn read_masked_field(file: &File, path: &Path, var_name: &str) -> Result<ArrayD<f32>> {
    let var = file
        .variable(var_name)
        .ok_or_else(|| DeepMipError::data(path, format!("variable '{}' not found", var_name)))?;

    let shape: Vec<usize> = var.dimensions().iter().map(netcdf::Dimension::len).collect();
    let values = var.get_values::<f32, _>(..)?;

    let fill_values: Vec<f32> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| numeric_attribute(&var, name))
        .map(|v| v as f32)
        .collect();

    let masked: Vec<f32> = values
        .into_iter()
        .map(|x| {
            if !x.is_finite() || x.abs() >= IMPLICIT_FILL_THRESHOLD || fill_values.contains(&x) {
                f32::NAN
            } else {
                x
            }
        })
        .collect();

    Ok(ArrayD::from_shape_vec(shape, masked)?)
}

/// Index of the dimension of `var` that plays the role of `kind`
pub fn find_axis(file: &File, var: &Variable, kind: AxisKind) -> Option<usize> {
    let dims = dimension_names(var);

    let by_attribute = dims.iter().position(|dim| {
        file.variable(dim)
            .and_then(|coord| string_attribute(&coord, "axis"))
            .map_or(false, |axis| axis.eq_ignore_ascii_case(kind.cf_axis()))
    });

    by_attribute.or_else(|| {
        dims.iter()
            .position(|dim| kind.fallback_names().contains(&dim.to_lowercase().as_str()))
    })
}

/// Values of the coordinate variable named like `dim`, if the file has one
pub fn coordinate_values(file: &File, dim: &str) -> Result<Option<Vec<f64>>> {
    match file.variable(dim) {
        Some(coord) => Ok(Some(coord.get_values::<f64, _>(..)?)),
        None => Ok(None),
    }
}

/// `units` attribute of the coordinate variable named like `dim`
pub fn coordinate_units(file: &File, dim: &str) -> Option<String> {
    file.variable(dim)
        .and_then(|coord| string_attribute(&coord, "units"))
}

/// Read a text attribute, ignoring non-text values
pub fn string_attribute(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(ss) => ss.into_iter().next(),
        _ => None,
    }
}

/// Read a scalar numeric attribute as `f64`
pub fn numeric_attribute(var: &Variable, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Floats(vs) => vs.first().map(|v| f64::from(*v)),
        AttributeValue::Doubles(vs) => vs.first().copied(),
        _ => None,
    }
}
