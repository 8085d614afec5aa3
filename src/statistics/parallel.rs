//! Parallel computation of global field statistics
//!
//! The field is split into 1-D lanes along the latitude axis so that every
//! element of a lane shares the weight table; lanes are reduced on the rayon
//! pool and the partial results merged sequentially in lane order.

use super::operations::FieldStats;
use crate::errors::Result;
use ndarray::{ArrayD, ArrayView1, Axis, ErrorKind, ShapeError};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy)]
struct Partial {
    weighted_sum: f64,
    weight: f64,
    plain_sum: f64,
    min: f64,
    max: f64,
    count: usize,
}

impl Partial {
    const EMPTY: Partial = Partial {
        weighted_sum: 0.0,
        weight: 0.0,
        plain_sum: 0.0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
        count: 0,
    };

    fn push(mut self, x: f32, w: f64) -> Self {
        if x.is_finite() {
            let x = f64::from(x);
            self.weighted_sum += w * x;
            self.weight += w;
            self.plain_sum += x;
            self.min = self.min.min(x);
            self.max = self.max.max(x);
            self.count += 1;
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            weighted_sum: self.weighted_sum + other.weighted_sum,
            weight: self.weight + other.weight,
            plain_sum: self.plain_sum + other.plain_sum,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            count: self.count + other.count,
        }
    }

    fn finish(self) -> FieldStats {
        if self.count == 0 {
            return FieldStats {
                mean: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                valid: 0,
            };
        }
        let mean = if self.weight > 0.0 {
            self.weighted_sum / self.weight
        } else {
            // only zero-weight rows (the poles) hold data
            self.plain_sum / self.count as f64
        };
        FieldStats {
            mean,
            min: self.min,
            max: self.max,
            valid: self.count,
        }
    }
}

fn reduce_lane(lane: &ArrayView1<'_, f32>, weights: &[f64]) -> Partial {
    lane.iter()
        .zip(weights)
        .fold(Partial::EMPTY, |acc, (&x, &w)| acc.push(x, w))
}

/// Area weights for a regular grid: cos(latitude), clamped at zero
pub fn latitude_weights(latitudes: &[f64]) -> Vec<f64> {
    latitudes
        .iter()
        .map(|lat| lat.to_radians().cos().max(0.0))
        .collect()
}

/// Computes weighted mean, min and max over every element of `data`,
/// skipping non-finite values.
///
/// `weights` apply along `weight_axis` and must match its length; without a
/// weight axis all elements count equally. A field without any finite value
/// yields NaN statistics with `valid == 0`.
///
/// # Errors
///
/// Returns an error if the weight table does not match the axis length.
pub fn parallel_field_stats(
    data: &ArrayD<f32>,
    weight_axis: Option<usize>,
    weights: Option<&[f64]>,
) -> Result<FieldStats> {
    if data.ndim() == 0 {
        let x = data.iter().copied().next().unwrap_or(f32::NAN);
        return Ok(Partial::EMPTY.push(x, 1.0).finish());
    }

    let axis = weight_axis.unwrap_or(data.ndim() - 1);
    if axis >= data.ndim() {
        return Err(ShapeError::from_kind(ErrorKind::OutOfBounds).into());
    }

    let axis_len = data.len_of(Axis(axis));
    let uniform;
    let weights = match weights {
        Some(w) if w.len() == axis_len => w,
        Some(_) => return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into()),
        None => {
            uniform = vec![1.0; axis_len];
            uniform.as_slice()
        }
    };

    let lanes: Vec<ArrayView1<'_, f32>> = data.lanes(Axis(axis)).into_iter().collect();

    tracing::trace!(
        "Reducing {} lanes across {} threads",
        lanes.len(),
        rayon::current_num_threads()
    );

    // merged in lane order so repeated runs give bit-identical sums
    let partials: Vec<Partial> = lanes
        .par_iter()
        .map(|lane| reduce_lane(lane, weights))
        .collect();
    let total = partials.into_iter().fold(Partial::EMPTY, Partial::merge);

    Ok(total.finish())
}
