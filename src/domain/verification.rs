use std::fmt;

use itertools::Itertools;

use crate::configuration::Expectations;

use super::run_stats::RunStatistics;

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationFailure {
    TooFewResults { expected: usize, actual: usize },
    LowRelevance { expected: f64, actual: f64 },
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationFailure::TooFewResults { expected, actual } => {
                write!(f, "Expected at least {} results, got {}", expected, actual)
            }
            VerificationFailure::LowRelevance { expected, actual } => write!(
                f,
                "Expected relevance ratio of {}, got {:.2}",
                expected, actual
            ),
        }
    }
}

/// Outcome of checking a run against its expectations. Each violated
/// criterion is kept separately.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Verification {
    pub failures: Vec<VerificationFailure>,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn reasons(&self) -> String {
        self.failures.iter().join("; ")
    }
}

pub fn verify(stats: &RunStatistics, expectations: &Expectations) -> Verification {
    let mut failures = vec![];

    if stats.total < expectations.expected_results {
        failures.push(VerificationFailure::TooFewResults {
            expected: expectations.expected_results,
            actual: stats.total,
        });
    }
    if stats.relevance_ratio < expectations.relevance_threshold {
        failures.push(VerificationFailure::LowRelevance {
            expected: expectations.relevance_threshold,
            actual: stats.relevance_ratio,
        });
    }

    Verification { failures }
}
