//! Shared fixtures: small dictionaries, netCDF writers and stand-ins for cdo.

#![allow(dead_code)]

use deepmip_check::dictionaries::Dictionaries;
use deepmip_check::errors::Result;
use ndarray::{Array1, ArrayD, IxDyn};
use netcdf::create;
use std::path::{Path, PathBuf};

pub const EXPERIMENT: &str = "deepmip-eocene-p1-x3";
pub const MODELS: [&str; 2] = ["ModelA-1", "ModelB-2"];

/// Two models that both ran one experiment, and three surface variables
pub fn test_dictionaries() -> Dictionaries {
    let models = r#"{
        "ModelA-1": { "version": "v1.0", "family": "FamA", "abbrv": "A",
                      "experiments": ["deepmip-eocene-p1-x3"], "gmst": [25.0] },
        "ModelB-2": { "version": "v1.0", "family": "FamB", "abbrv": "B",
                      "experiments": ["deepmip-eocene-p1-x3"], "gmst": [26.0] }
    }"#;
    let experiments = r#"{
        "deepmip-eocene-p1-x3": { "long_name": "deepmip-eocene-p1-x3", "medium_name": "DeepMIP_3x",
                                  "short_name": "3xCO2", "co2": 840 }
    }"#;
    let variables = r#"{
        "excluded_from_tables": [],
        "variables": {
            "tas": { "long_name": "Near-surface air temperature", "unit": "K", "dimensions": 3,
                     "realm": "atmos", "valid_range": [180, 340] },
            "ts":  { "long_name": "Surface temperature", "unit": "K", "dimensions": 3,
                     "realm": "atmos", "valid_range": [180, 350] },
            "pr":  { "long_name": "Precipitation", "unit": "kg m-2 s-1", "dimensions": 3,
                     "realm": "atmos", "valid_range": [0, 0.005],
                     "display": { "factor": 86400, "unit": "mm day-1" } }
        }
    }"#;
    Dictionaries::from_json_strs(models, experiments, variables).expect("test dictionaries are valid")
}

/// Climatology path of `variable` for `model` under `root`, following the DeepMIP layout
pub fn source_path(root: &Path, family: &str, model: &str, variable: &str) -> PathBuf {
    root.join(family)
        .join(model)
        .join(EXPERIMENT)
        .join("v1.0")
        .join("climatology")
        .join(format!("{variable}_{model}_{EXPERIMENT}_v1.0.mean.nc"))
}

/// Regular latitudes from -60 to 60 in steps of 60
pub const LATS: [f64; 3] = [-60.0, 0.0, 60.0];
pub const NLON: usize = 4;

/// Write a (time, lat, lon) field whose value depends only on latitude
pub fn write_surface_field(
    path: &Path,
    variable: &str,
    timesteps: usize,
    per_lat: [f32; 3],
) -> Result<()> {
    let values: Vec<f32> = (0..timesteps)
        .flat_map(|_| per_lat.iter().flat_map(|v| std::iter::repeat(*v).take(NLON)))
        .collect();
    let data = ArrayD::from_shape_vec(IxDyn(&[timesteps, LATS.len(), NLON]), values)?;
    write_field(path, variable, &data, &["time", "lat", "lon"], None, None)
}

/// Write `data` as `variable` with CF coordinates for each named dimension.
///
/// `fill` becomes the `_FillValue` attribute; `vertical` gives the values and
/// units of a `plev`/`lev`/`depth` coordinate.
pub fn write_field(
    path: &Path,
    variable: &str,
    data: &ArrayD<f32>,
    dims: &[&str],
    fill: Option<f32>,
    vertical: Option<(&[f64], &str)>,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = create(path)?;
    file.add_attribute("title", "deepmip_check test fixture")?;

    for (dim, len) in dims.iter().zip(data.shape()) {
        file.add_dimension(dim, *len)?;
    }

    for (dim, len) in dims.iter().zip(data.shape()) {
        let (axis, units, values): (&str, &str, Vec<f64>) = match *dim {
            "time" => ("T", "days since 0001-01-01", (0..*len).map(|i| i as f64 * 30.0).collect()),
            "lat" => ("Y", "degrees_north", LATS.iter().copied().take(*len).collect()),
            "lon" => ("X", "degrees_east", (0..*len).map(|i| i as f64 * 90.0).collect()),
            _ => match vertical {
                Some((coords, units)) => ("Z", units, coords.to_vec()),
                None => continue,
            },
        };
        let mut coord = file.add_variable::<f64>(dim, &[*dim])?;
        coord.put_attribute("axis", axis)?;
        coord.put_attribute("units", units)?;
        coord.put(Array1::from(values).view(), ..)?;
    }

    let mut var = file.add_variable::<f32>(variable, dims)?;
    if let Some(fill) = fill {
        var.put_attribute("_FillValue", fill)?;
    }
    var.put_attribute("units", "1")?;
    var.put(data.view(), ..)?;
    Ok(())
}

/// Executable shell script at `dir/name`
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("make script executable");
    path
}

/// Stand-in for cdo that copies its second-to-last argument to its last
#[cfg(unix)]
pub fn copying_tool(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fake-cdo",
        "#!/bin/sh\nfor a; do prev=$last; last=$a; done\ncp \"$prev\" \"$last\"\n",
    )
}

/// Stand-in for cdo that always fails
#[cfg(unix)]
pub fn failing_tool(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "broken-cdo",
        "#!/bin/sh\necho 'cdo remapbil: Unsupported grid' >&2\nexit 1\n",
    )
}

/// Stand-in for cdo that starts writing its output and then hangs
#[cfg(unix)]
pub fn hanging_tool(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "hanging-cdo",
        "#!/bin/sh\nfor a; do last=$a; done\necho partial > \"$last\"\nexec sleep 30\n",
    )
}

/// Stand-in for cdo that copies like [`copying_tool`] but fails on `-setmisstonn`
#[cfg(unix)]
pub fn fill_failing_tool(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "nofill-cdo",
        "#!/bin/sh\ncase \"$2\" in -setmisstonn) echo 'cdo setmisstonn: Abort' >&2; exit 1;; esac\n\
for a; do prev=$last; last=$a; done\ncp \"$prev\" \"$last\"\n",
    )
}
