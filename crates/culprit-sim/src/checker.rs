//! Invariant checks over the result of one simulated search.

use std::fmt;

use culprit_core::{HuntError, HuntReport, InfrastructureError};
use serde::Serialize;

use crate::scenario::{Scenario, call_bound};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    /// A monotonic scenario reported the wrong unit or none at all.
    WrongCulprit {
        expected: usize,
        reported: Option<usize>,
    },
    /// More oracle calls than the logarithmic bound allows.
    CallBudgetExceeded { calls: usize, bound: usize },
    /// The search kept calling the oracle after an infrastructure failure.
    CallsAfterInfrastructureFault { fault_call: usize, calls: usize },
    /// An injected infrastructure failure was reached but not reported.
    InfrastructureFaultSwallowed { fault_call: usize },
    /// The search failed although nothing was injected.
    UnexpectedError { message: String },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongCulprit { expected, reported } => match reported {
                Some(index) => write!(f, "WrongCulprit: expected unit {expected}, got {index}"),
                None => write!(f, "WrongCulprit: expected unit {expected}, got nothing"),
            },
            Self::CallBudgetExceeded { calls, bound } => {
                write!(f, "CallBudgetExceeded: {calls} oracle calls > bound {bound}")
            }
            Self::CallsAfterInfrastructureFault { fault_call, calls } => write!(
                f,
                "CallsAfterInfrastructureFault: failure on call {fault_call} but {calls} calls issued"
            ),
            Self::InfrastructureFaultSwallowed { fault_call } => write!(
                f,
                "InfrastructureFaultSwallowed: call {fault_call} failed but the search did not stop"
            ),
            Self::UnexpectedError { message } => write!(f, "UnexpectedError: {message}"),
        }
    }
}

/// Classification of one simulated search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    /// Non-monotonic scenario; any answer is tolerated. `misplaced` is true
    /// when the reported unit is not the first cause.
    Masked { misplaced: bool },
    Failed { violations: Vec<InvariantViolation> },
}

pub struct HuntChecker;

impl HuntChecker {
    /// Check a search result against what the scenario guarantees.
    ///
    /// `calls` is the number of oracle calls actually received.
    #[must_use]
    pub fn check(
        scenario: &Scenario,
        result: &Result<HuntReport, HuntError>,
        calls: usize,
    ) -> Verdict {
        let mut violations = Vec::new();

        let bound = call_bound(scenario.len);
        if calls > bound {
            violations.push(InvariantViolation::CallBudgetExceeded { calls, bound });
        }

        // An injected failure beyond the last call of a finished search is
        // simply never reached.
        let injected = scenario
            .infrastructure_fault_on
            .filter(|fault_call| *fault_call <= calls);

        match (injected, result) {
            (Some(fault_call), Err(HuntError::Infrastructure(InfrastructureError::Simulated { call })))
                if *call == fault_call =>
            {
                if calls != fault_call {
                    violations.push(InvariantViolation::CallsAfterInfrastructureFault {
                        fault_call,
                        calls,
                    });
                }
            }
            (Some(fault_call), _) => {
                violations.push(InvariantViolation::InfrastructureFaultSwallowed { fault_call });
            }
            (None, Err(err)) if scenario.is_monotonic() => {
                violations.push(InvariantViolation::UnexpectedError {
                    message: err.to_string(),
                });
            }
            (None, result) if scenario.is_monotonic() => {
                let reported = result
                    .as_ref()
                    .ok()
                    .and_then(HuntReport::found)
                    .map(|(_, found)| found.index);
                if reported != Some(scenario.cause) {
                    violations.push(InvariantViolation::WrongCulprit {
                        expected: scenario.cause,
                        reported,
                    });
                }
            }
            (None, result) => {
                if violations.is_empty() {
                    let misplaced = result
                        .as_ref()
                        .ok()
                        .and_then(HuntReport::found)
                        .is_none_or(|(_, found)| found.index != scenario.cause);
                    return Verdict::Masked { misplaced };
                }
            }
        }

        if violations.is_empty() {
            Verdict::Passed
        } else {
            Verdict::Failed { violations }
        }
    }
}
