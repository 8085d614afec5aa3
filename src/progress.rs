//! Console progress for a table run
//!
//! Owned by the accumulation task, so no synchronisation is needed.

use crate::table::RowStatus;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Progress {
    total: usize,
    completed: usize,
    quiet: bool,
    started: Instant,
}

impl Progress {
    pub fn new(total: usize, quiet: bool) -> Self {
        Self {
            total,
            completed: 0,
            quiet,
            started: Instant::now(),
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Count one finished unit and print its line
    pub fn report(&mut self, label: &str, status: RowStatus) {
        self.completed += 1;
        tracing::debug!(completed = self.completed, total = self.total, unit = label, status = status.as_str());
        if !self.quiet {
            println!("{}", self.line(label, status));
        }
    }

    /// `[  3/120] tas MIROC4m deepmip-eocene-p1-x3 mean: ok`
    pub fn line(&self, label: &str, status: RowStatus) -> String {
        let width = self.total.to_string().len();
        format!(
            "[{:>width$}/{}] {}: {}",
            self.completed,
            self.total,
            label,
            status.as_str(),
            width = width
        )
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_right_aligned() {
        let mut progress = Progress::new(120, true);
        progress.report("tas MIROC4m deepmip-eocene-p1-x3 mean", RowStatus::Ok);
        progress.report("pr MIROC4m deepmip-eocene-p1-x3 mean", RowStatus::Missing);
        assert_eq!(progress.completed(), 2);
        assert_eq!(
            progress.line("pr MIROC4m deepmip-eocene-p1-x3 mean", RowStatus::Missing),
            "[  2/120] pr MIROC4m deepmip-eocene-p1-x3 mean: missing"
        );
    }
}
