//! The `regrid` command against a fixture database with a stand-in for cdo.

#![cfg(unix)]

mod common;

use common::*;
use deepmip_check::bulk_regrid::regrid_all;
use deepmip_check::prelude::*;
use tempfile::tempdir;

fn settings(out_dir: &std::path::Path, tool: std::path::PathBuf) -> RegridSettings {
    let mut settings = RegridSettings::new(out_dir);
    settings.tool = tool;
    settings
}

#[tokio::test]
async fn regrids_every_available_file() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("db");
    for (model, family) in [(MODELS[0], "FamA"), (MODELS[1], "FamB")] {
        write_surface_field(&source_path(&root, family, model, "tas"), "tas", 12, [270.0, 300.0, 270.0])?;
    }
    write_surface_field(&source_path(&root, "FamA", MODELS[0], "pr"), "pr", 12, [1e-5, 4e-5, 1e-5])?;

    let out_dir = dir.path().join("regridded");
    let regridder = CdoRegridder::new(settings(&out_dir, copying_tool(dir.path())));
    let variables = vec!["tas".to_string(), "pr".to_string()];

    let summary = regrid_all(&test_dictionaries(), &root, &variables, &regridder, 2).await?;
    assert_eq!(summary.regridded, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert!(out_dir
        .join(format!("tas_{}_{}_v1.0.mean.r180x90.nc", MODELS[1], EXPERIMENT))
        .is_file());

    // second pass reuses everything
    let again = regrid_all(&test_dictionaries(), &root, &variables, &regridder, 2).await?;
    assert_eq!(again.cached, 3);
    assert_eq!(again.regridded, 0);
    Ok(())
}

#[tokio::test]
async fn sea_surface_temperature_gets_a_filled_copy() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("db");
    let dicts = Dictionaries::deepmip_eocene()?;
    let input = root
        .join("MIROC/MIROC4m/deepmip-eocene-p1-x3/v1.0/climatology")
        .join("tos_MIROC4m_deepmip-eocene-p1-x3_v1.0.mean.nc");
    std::fs::create_dir_all(input.parent().unwrap())?;
    std::fs::write(&input, b"placeholder")?;

    let out_dir = dir.path().join("regridded");
    let regridder = CdoRegridder::new(settings(&out_dir, copying_tool(dir.path())));

    let summary = regrid_all(&dicts, &root, &["tos".to_string()], &regridder, 4).await?;
    let runs: usize = dicts.models.values().map(|m| m.experiments.len()).sum();
    assert_eq!(summary.regridded, 1);
    assert_eq!(summary.skipped, runs - 1);

    let names: Vec<String> = summary
        .outputs
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "tos_MIROC4m_deepmip-eocene-p1-x3_v1.0.mean.r180x90.filled.nc",
            "tos_MIROC4m_deepmip-eocene-p1-x3_v1.0.mean.r180x90.nc",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn tool_failures_are_counted_not_fatal() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("db");
    write_surface_field(&source_path(&root, "FamA", MODELS[0], "tas"), "tas", 1, [270.0, 300.0, 270.0])?;

    let out_dir = dir.path().join("regridded");
    let regridder = CdoRegridder::new(settings(&out_dir, failing_tool(dir.path())));
    let summary = regrid_all(&test_dictionaries(), &root, &["tas".to_string()], &regridder, 1).await?;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.outputs.is_empty());
    Ok(())
}

#[tokio::test]
async fn interrupted_fill_is_completed_on_the_next_run() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("db");
    let dicts = Dictionaries::deepmip_eocene()?;
    let input = root
        .join("MIROC/MIROC4m/deepmip-eocene-p1-x3/v1.0/climatology")
        .join("tos_MIROC4m_deepmip-eocene-p1-x3_v1.0.mean.nc");
    std::fs::create_dir_all(input.parent().unwrap())?;
    std::fs::write(&input, b"placeholder")?;

    let out_dir = dir.path().join("regridded");
    let regridded = out_dir.join("tos_MIROC4m_deepmip-eocene-p1-x3_v1.0.mean.r180x90.nc");
    let filled = out_dir.join("tos_MIROC4m_deepmip-eocene-p1-x3_v1.0.mean.r180x90.filled.nc");
    let variables = ["tos".to_string()];

    let flaky = CdoRegridder::new(settings(&out_dir, fill_failing_tool(dir.path())));
    let first = regrid_all(&dicts, &root, &variables, &flaky, 1).await?;
    assert_eq!(first.failed, 1);
    assert!(regridded.is_file());
    assert!(!filled.exists());

    let working = CdoRegridder::new(settings(&out_dir, copying_tool(dir.path())));
    let second = regrid_all(&dicts, &root, &variables, &working, 1).await?;
    assert_eq!(second.regridded, 1);
    assert_eq!(second.cached, 0);
    assert!(filled.is_file());

    let third = regrid_all(&dicts, &root, &variables, &working, 1).await?;
    assert_eq!(third.cached, 1);
    Ok(())
}
