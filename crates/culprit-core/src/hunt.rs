//! Entry point: validate the input, then bisect it.

use serde::Serialize;
use tracing::{info, warn};

use crate::bisect::{Bisection, BisectionResult, bisect};
use crate::error::HuntError;
use crate::oracle::OracleRunner;
use crate::progress::{Progress, Tracker, estimate_calls};
use crate::unit::{Assertion, Sequence, Unit};
use crate::validate::check_preconditions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HuntOutcome {
    /// The unit whose inclusion makes the fault reproducible.
    Found { unit: Unit, result: BisectionResult },
    /// Preconditions held but the search isolated nothing, which means the
    /// oracle is not monotonic or not deterministic for this input.
    Inconclusive,
}

/// Final result of one search, handed to the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HuntReport {
    pub outcome: HuntOutcome,
    /// Oracle calls issued, bracket checks included.
    pub calls: usize,
    /// Estimated bisection calls, `ceil(log2 n)`.
    pub estimate: usize,
}

impl HuntReport {
    #[must_use]
    pub const fn found(&self) -> Option<(&Unit, &BisectionResult)> {
        match &self.outcome {
            HuntOutcome::Found { unit, result } => Some((unit, result)),
            HuntOutcome::Inconclusive => None,
        }
    }
}

/// Find the unit of `sequence` responsible for the fault signaled by
/// `assertion` (or by an error, when there is no assertion).
///
/// `on_progress` is called once per oracle call, before it runs.
///
/// # Errors
///
/// Returns [`HuntError::Precondition`] when the full input does not fault or
/// the empty input already does, and [`HuntError::Infrastructure`] when the
/// isolated environment fails. Both abort the search at once.
pub fn hunt<R, F>(
    sequence: &Sequence,
    assertion: Option<&Assertion>,
    oracle: &mut R,
    on_progress: F,
) -> Result<HuntReport, HuntError>
where
    R: OracleRunner + ?Sized,
    F: FnMut(&Progress),
{
    let estimate = estimate_calls(sequence.len());
    let mut tracker = Tracker::new(estimate, on_progress);
    info!(
        units = sequence.len(),
        estimate,
        assertion = assertion.is_some(),
        "starting hunt"
    );

    check_preconditions(sequence, assertion, oracle, &mut tracker)?;
    let bisection = bisect(sequence, assertion, oracle, &mut tracker)?;

    let outcome = match bisection {
        Bisection::Found(result) => {
            let unit = sequence[result.index].clone();
            info!(
                index = result.index,
                line = unit.line(),
                calls = tracker.calls(),
                "culprit isolated"
            );
            HuntOutcome::Found { unit, result }
        }
        Bisection::NotFound => {
            warn!(
                calls = tracker.calls(),
                "bisection isolated nothing although the full input faults; \
                 the fault is not monotonic or not deterministic"
            );
            HuntOutcome::Inconclusive
        }
    };

    Ok(HuntReport {
        outcome,
        calls: tracker.calls(),
        estimate,
    })
}
