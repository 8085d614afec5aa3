//! Core statistical operations and types
//!
//! This module defines the global statistics reported per field.

use serde::Serialize;

/// Statistics reported for every field, in table column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatOperation {
    /// Global minimum
    Min,
    /// Area-weighted global mean
    Mean,
    /// Global maximum
    Max,
}

impl StatOperation {
    pub const ALL: [StatOperation; 3] = [Self::Min, Self::Mean, Self::Max];

    /// Get the string representation of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Mean => "mean",
            Self::Max => "max",
        }
    }
}

/// Global mean/min/max of one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Number of finite values that entered the statistics
    pub valid: usize,
}

impl FieldStats {
    /// Value of one statistic
    #[must_use]
    pub const fn get(&self, op: StatOperation) -> f64 {
        match op {
            StatOperation::Min => self.min,
            StatOperation::Mean => self.mean,
            StatOperation::Max => self.max,
        }
    }

    /// Multiply every statistic by `factor` (unit conversion for display)
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        // a negative factor swaps the roles of min and max
        let (a, b) = (self.min * factor, self.max * factor);
        Self {
            mean: self.mean * factor,
            min: a.min(b),
            max: a.max(b),
            valid: self.valid,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.min.is_finite() && self.max.is_finite()
    }
}
