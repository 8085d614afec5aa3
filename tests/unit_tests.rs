//! Unit tests for the aggregation layer on real netCDF fixtures
//!
//! Every fixture is written with the `netcdf` crate into a temporary
//! directory and then aggregated the way the pipeline does it.

mod common;

use common::*;
use deepmip_check::{
    dictionaries::Dictionaries,
    errors::{DeepMipError, Result},
    sanity::{check, ValidRange},
    statistics::{aggregate_file, StatOperation},
    table::CellOutcome,
};
use ndarray::{ArrayD, IxDyn};
use std::path::PathBuf;
use tempfile::tempdir;

fn eocene() -> Dictionaries {
    Dictionaries::deepmip_eocene().expect("embedded dictionaries")
}

#[test]
fn test_error_types() {
    let missing = DeepMipError::MissingFile(PathBuf::from("/db/tas.nc"));
    assert!(format!("{}", missing).contains("File not found"));
    assert!(!missing.is_fatal());

    let tool = DeepMipError::tool("cdo", "exit code 1: Unsupported grid");
    assert_eq!(format!("{}", tool), "cdo failed: exit code 1: Unsupported grid");

    let data = DeepMipError::data("/db/x.nc", "no time axis");
    assert!(format!("{}", data).contains("no time axis"));

    assert!(DeepMipError::Configuration("unknown model".into()).is_fatal());

    // each per-unit error kind maps to its own cell
    assert_eq!(CellOutcome::from_error(&missing), CellOutcome::Missing);
    assert!(matches!(CellOutcome::from_error(&tool), CellOutcome::Failed(_)));
    assert!(matches!(CellOutcome::from_error(&data), CellOutcome::Invalid(_)));
}

#[test]
fn test_weighted_global_mean() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("tas.nc");
    write_surface_field(&path, "tas", 12, [270.0, 300.0, 270.0])?;

    let dicts = eocene();
    let result = aggregate_file(&path, "tas", dicts.variable("tas").unwrap())?;

    // weights cos(-60), cos(0), cos(60) = 0.5, 1, 0.5
    assert!((result.stats.mean - 285.0).abs() < 1e-6);
    assert_eq!(result.stats.get(StatOperation::Min), 270.0);
    assert_eq!(result.stats.get(StatOperation::Max), 300.0);
    assert_eq!(result.stats.valid, 12 * 3 * NLON);
    assert_eq!(result.timesteps, Some(12));
    assert!(result.level.is_none());

    let report = check(&result, ValidRange::for_variable(dicts.variable("tas").unwrap()));
    assert!(report.passed);
    Ok(())
}

#[test]
fn test_fill_values_are_ignored() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("tos.nc");

    // one explicit fill value and one CDO-style missing value
    let mut values = Vec::new();
    for lat in 0..3 {
        for lon in 0..NLON {
            values.push(match (lat, lon) {
                (0, 0) => -999.0f32,
                (2, 3) => 1.0e20,
                _ => 20.0,
            });
        }
    }
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 3, NLON]), values)?;
    write_field(&path, "tos", &data, &["time", "lat", "lon"], Some(-999.0), None)?;

    let dicts = eocene();
    let result = aggregate_file(&path, "tos", dicts.variable("tos").unwrap())?;
    assert_eq!(result.stats.valid, 3 * NLON - 2);
    assert_eq!(result.stats.min, 20.0);
    assert_eq!(result.stats.max, 20.0);
    assert!((result.stats.mean - 20.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_pressure_level_selection() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ta.nc");

    // plev in Pa: 100000, 50000, 20000; only the middle level is 250 K
    let plev = [100_000.0, 50_000.0, 20_000.0];
    let mut values = Vec::new();
    for level_value in [290.0f32, 250.0, 220.0] {
        values.extend(std::iter::repeat(level_value).take(3 * NLON));
    }
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 3, 3, NLON]), values)?;
    write_field(
        &path,
        "ta",
        &data,
        &["time", "plev", "lat", "lon"],
        None,
        Some((&plev[..], "Pa")),
    )?;

    let dicts = eocene();
    let result = aggregate_file(&path, "ta", dicts.variable("ta").unwrap())?;
    let level = result.level.expect("a level was chosen");
    assert_eq!(level.dimension, "plev");
    assert_eq!(level.index, 1);
    assert_eq!(level.value, Some(50_000.0));
    assert_eq!(result.stats.min, 250.0);
    assert_eq!(result.stats.max, 250.0);
    Ok(())
}

#[test]
fn test_ocean_depth_selection_in_centimeters() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("thetao.nc");

    let depth = [500.0, 95_000.0, 250_000.0];
    let mut values = Vec::new();
    for level_value in [25.0f32, 12.0, 4.0] {
        values.extend(std::iter::repeat(level_value).take(3 * NLON));
    }
    let data = ArrayD::from_shape_vec(IxDyn(&[12, 3, 3, NLON]), values.repeat(12))?;
    write_field(
        &path,
        "thetao",
        &data,
        &["time", "depth", "lat", "lon"],
        None,
        Some((&depth[..], "centimeters")),
    )?;

    let dicts = eocene();
    let result = aggregate_file(&path, "thetao", dicts.variable("thetao").unwrap())?;
    assert_eq!(result.level.unwrap().index, 1);
    assert!((result.stats.mean - 12.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_unknown_vertical_units_are_invalid() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ta.nc");
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 2, 3, NLON]), vec![250.0f32; 2 * 3 * NLON])?;
    write_field(
        &path,
        "ta",
        &data,
        &["time", "plev", "lat", "lon"],
        None,
        Some((&[1.0, 2.0][..], "furlongs")),
    )?;

    let dicts = eocene();
    let err = aggregate_file(&path, "ta", dicts.variable("ta").unwrap()).unwrap_err();
    assert!(matches!(err, DeepMipError::Data { .. }));
    assert!(err.to_string().contains("furlongs"));
    Ok(())
}

#[test]
fn test_dimension_count_must_match() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("tas.nc");
    let data = ArrayD::from_shape_vec(IxDyn(&[3, NLON]), vec![288.0f32; 3 * NLON])?;
    write_field(&path, "tas", &data, &["lat", "lon"], None, None)?;

    let dicts = eocene();
    let err = aggregate_file(&path, "tas", dicts.variable("tas").unwrap()).unwrap_err();
    assert!(err.to_string().contains("2 dimensions, but should have 3"));
    Ok(())
}

#[test]
fn test_timesteps_must_be_one_or_twelve() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("tas.nc");
    write_surface_field(&path, "tas", 6, [280.0, 290.0, 280.0])?;

    let dicts = eocene();
    let err = aggregate_file(&path, "tas", dicts.variable("tas").unwrap()).unwrap_err();
    assert!(err.to_string().contains("6 timesteps"));
    Ok(())
}

#[test]
fn test_boundary_condition_has_no_time_axis() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("orog.nc");
    let data = ArrayD::from_shape_vec(
        IxDyn(&[3, NLON]),
        vec![0.0f32, 100.0, 200.0, 300.0, 0.0, 0.0, 0.0, 0.0, 1000.0, 1000.0, 1000.0, 1000.0],
    )?;
    write_field(&path, "orog", &data, &["lat", "lon"], None, None)?;

    let dicts = eocene();
    let result = aggregate_file(&path, "orog", dicts.variable("orog").unwrap())?;
    assert_eq!(result.timesteps, None);
    assert_eq!(result.stats.max, 1000.0);
    assert_eq!(result.stats.min, 0.0);
    Ok(())
}

#[test]
fn test_missing_variable_and_unreadable_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("tas.nc");
    write_surface_field(&path, "tas", 1, [280.0, 290.0, 280.0])?;

    let dicts = eocene();
    let err = aggregate_file(&path, "pr", dicts.variable("pr").unwrap()).unwrap_err();
    assert!(err.to_string().contains("variable 'pr' not found"));

    let garbage = dir.path().join("garbage.nc");
    std::fs::write(&garbage, b"not a netcdf file")?;
    let err = aggregate_file(&garbage, "tas", dicts.variable("tas").unwrap()).unwrap_err();
    assert!(matches!(err, DeepMipError::Data { .. }));
    Ok(())
}

#[test]
fn test_all_missing_field_is_invalid() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("tas.nc");
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 3, NLON]), vec![-999.0f32; 3 * NLON])?;
    write_field(&path, "tas", &data, &["time", "lat", "lon"], Some(-999.0), None)?;

    let dicts = eocene();
    let err = aggregate_file(&path, "tas", dicts.variable("tas").unwrap()).unwrap_err();
    assert!(err.to_string().contains("no finite values"));
    Ok(())
}
