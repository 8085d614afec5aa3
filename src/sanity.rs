//! Range checks on aggregated values
//!
//! Both bounds of a valid range are inclusive: a statistic exactly equal to
//! `lo` or `hi` passes.

use crate::dictionaries::VariableRecord;
use crate::statistics::{AggregateResult, StatOperation};
use serde::Serialize;

/// Closed interval `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidRange {
    pub lo: f64,
    pub hi: f64,
}

impl ValidRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Inclusive on both ends; NaN is never contained
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lo && x <= self.hi
    }

    pub fn for_variable(variable: &VariableRecord) -> Option<Self> {
        variable.valid_range.map(|(lo, hi)| Self::new(lo, hi))
    }
}

/// Outcome of a sanity check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanityReport {
    pub passed: bool,
    pub warning: Option<String>,
}

impl SanityReport {
    pub fn pass() -> Self {
        Self {
            passed: true,
            warning: None,
        }
    }

    pub fn fail(warning: impl Into<String>) -> Self {
        Self {
            passed: false,
            warning: Some(warning.into()),
        }
    }
}

/// Check mean, min and max of `result` against `range`.
///
/// Without a range only finiteness is required.
pub fn check(result: &AggregateResult, range: Option<ValidRange>) -> SanityReport {
    if !result.stats.is_finite() {
        return SanityReport::fail("non-finite statistics");
    }

    let Some(range) = range else {
        return SanityReport::pass();
    };

    let outside: Vec<String> = StatOperation::ALL
        .iter()
        .filter(|op| !range.contains(result.stats.get(**op)))
        .map(|op| format!("{}={}", op.as_str(), result.stats.get(*op)))
        .collect();

    if outside.is_empty() {
        SanityReport::pass()
    } else {
        SanityReport::fail(format!(
            "outside [{}, {}]: {}",
            range.lo,
            range.hi,
            outside.join(", ")
        ))
    }
}
