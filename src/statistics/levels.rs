//! Vertical level selection for 4-D variables
//!
//! Every model stores 3-D fields on its own vertical axis. To compare them
//! one level is picked per variable that is consistent across the ensemble:
//! 500 hPa for pressure levels, 1000 m for ocean depth levels, and the first
//! level for winds on native model levels.

use serde::Serialize;

/// Winds that DeepMIP requests on native model levels
pub const MODEL_LEVEL_VARIABLES: [&str; 3] = ["ua", "va", "wa"];

/// The level a 4-D field was reduced to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSelection {
    pub dimension: String,
    pub index: usize,
    /// Coordinate value at `index`, when the file has a coordinate variable
    pub value: Option<f64>,
    pub units: Option<String>,
}

/// Target coordinate value for a vertical axis with the given units
pub fn target_level(units: &str) -> Option<f64> {
    match units.trim() {
        "Pa" => Some(50_000.0),
        "hPa" | "mbar" => Some(500.0),
        "m" | "meters" | "metre" | "metres" => Some(1_000.0),
        "centimeters" | "cm" => Some(100_000.0),
        _ => None,
    }
}

/// Index of the coordinate closest to `target`; ties go to the first
pub fn nearest_index(coords: &[f64], target: f64) -> Option<usize> {
    coords
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, &c)| {
            let dist = (c - target).abs();
            match best {
                Some((_, d)) if d <= dist => best,
                _ => Some((i, dist)),
            }
        })
        .map(|(i, _)| i)
}

/// Pick the level of `dimension` to keep for `variable`.
///
/// Returns a message describing why no level could be chosen.
pub fn choose_level(
    variable: &str,
    dimension: &str,
    units: Option<&str>,
    coords: Option<&[f64]>,
) -> std::result::Result<LevelSelection, String> {
    if let Some(target) = units.and_then(target_level) {
        let coords = coords.ok_or_else(|| {
            format!("vertical dimension '{}' has no coordinate values", dimension)
        })?;
        let index = nearest_index(coords, target).ok_or_else(|| {
            format!("vertical dimension '{}' has no finite coordinates", dimension)
        })?;
        return Ok(LevelSelection {
            dimension: dimension.to_string(),
            index,
            value: Some(coords[index]),
            units: units.map(str::to_string),
        });
    }

    if MODEL_LEVEL_VARIABLES.contains(&variable) {
        return Ok(LevelSelection {
            dimension: dimension.to_string(),
            index: 0,
            value: coords.and_then(|c| c.first().copied()),
            units: units.map(str::to_string),
        });
    }

    Err(format!(
        "unknown vertical units '{}' in dimension '{}'",
        units.unwrap_or(""),
        dimension
    ))
}
