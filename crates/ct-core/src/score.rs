//! Test scores.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of fixtures run against an exercise and how many passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TestScore {
    pub total: u32,
    pub passed: u32,
}

impl TestScore {
    /// Creates a score, capping `passed` at `total`.
    #[must_use]
    pub fn new(total: u32, passed: u32) -> Self {
        Self {
            total,
            passed: passed.min(total),
        }
    }

    /// A score where nothing passed.
    #[must_use]
    pub const fn failed(total: u32) -> Self {
        Self { total, passed: 0 }
    }

    /// Pass rate in \[0.0, 1.0\]. A score without tests has rate 0.
    #[must_use]
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.passed) / f64::from(self.total)
        }
    }

    /// True if every fixture passed.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }

    /// Compares pass rates exactly, without going through floats.
    #[must_use]
    pub fn cmp_rate(&self, other: &Self) -> Ordering {
        match (self.total, other.total) {
            (0, 0) => Ordering::Equal,
            (0, _) => 0u32.cmp(&other.passed),
            (_, 0) => self.passed.cmp(&0),
            _ => (u64::from(self.passed) * u64::from(other.total))
                .cmp(&(u64::from(other.passed) * u64::from(self.total))),
        }
    }
}

impl fmt::Display for TestScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.passed, self.total)
    }
}
