//! Creates a small DeepMIP-style database for trying out deepmip-check.
//!
//! Two models of the DeepMIP-Eocene ensemble get `tas` and `pr`
//! climatologies for the 3xCO2 experiment; one `pr` file is left out so the
//! table shows a missing cell.

use ndarray::{Array1, Array3};
use netcdf::create;
use std::path::Path;

const EXPERIMENT: &str = "deepmip-eocene-p1-x3";

fn write_climatology(
    path: &Path,
    variable: &str,
    units: &str,
    equator: f32,
    pole: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(path.parent().ok_or("no parent directory")?)?;
    if path.exists() {
        std::fs::remove_file(path)?
    }

    let mut file = create(path)?;
    file.add_attribute("title", "deepmip-check demo climatology")?;

    file.add_dimension("time", 12)?;
    file.add_dimension("lat", 18)?;
    file.add_dimension("lon", 36)?;

    let lats: Vec<f64> = (0..18).map(|i| -85.0 + i as f64 * 10.0).collect();
    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("axis", "T")?;
        time_var.put_attribute("units", "days since 0001-01-01")?;
        time_var.put(Array1::from((0..12).map(|i| i as f64 * 30.0).collect::<Vec<_>>()).view(), ..)?;
    }
    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("axis", "Y")?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put(Array1::from(lats.clone()).view(), ..)?;
    }
    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("axis", "X")?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put(Array1::from((0..36).map(|i| i as f64 * 10.0).collect::<Vec<_>>()).view(), ..)?;
    }

    let field = Array3::from_shape_fn((12, 18, 36), |(t, j, _)| {
        let blend = lats[j].to_radians().cos() as f32;
        let season = (t as f32 * std::f32::consts::PI / 6.0).cos() * 0.02;
        (pole + (equator - pole) * blend) * (1.0 + season)
    });
    let mut var = file.add_variable::<f32>(variable, &["time", "lat", "lon"])?;
    var.put_attribute("units", units)?;
    var.put_attribute("_FillValue", 1.0e20f32)?;
    var.put(field.view(), ..)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new("deepmip_demo");
    println!("🔨 Creating demo database: {}", root.display());

    for (family, model, warm) in [("CESM", "CESM1.2-CAM5", 0.0f32), ("MIROC", "MIROC4m", 2.0)] {
        let dir = root
            .join(family)
            .join(model)
            .join(EXPERIMENT)
            .join("v1.0")
            .join("climatology");

        write_climatology(
            &dir.join(format!("tas_{model}_{EXPERIMENT}_v1.0.mean.nc")),
            "tas",
            "K",
            303.0 + warm,
            260.0 + warm,
        )?;
        if model == "CESM1.2-CAM5" {
            write_climatology(
                &dir.join(format!("pr_{model}_{EXPERIMENT}_v1.0.mean.nc")),
                "pr",
                "kg m-2 s-1",
                8.0e-5,
                1.0e-5,
            )?;
        }
    }

    println!("✅ Successfully created demo files");
    println!("\n🧪 Check them with:");
    println!(
        "   cargo run -- --data-root {} --experiment {} --variable tas --variable pr",
        root.display(),
        EXPERIMENT
    );
    Ok(())
}
