//! Per-call progress accounting.
//!
//! The call counter and the estimate are the only state shared across oracle
//! calls. They live in a [`Tracker`] threaded through the validator and the
//! bisector rather than in globals.

use serde::Serialize;

use crate::error::InfrastructureError;
use crate::oracle::{OracleOutcome, OracleRunner};
use crate::unit::{Assertion, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Bracket checks on the full and the empty input.
    Validate,
    /// Partition-and-test steps.
    Bisect,
}

/// Emitted once per oracle call, right before the call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub phase: Phase,
    /// 1-based call number within `phase`.
    pub call: usize,
    /// Expected number of bisection calls; informational only.
    pub estimate: usize,
    /// Number of units in the test set about to run.
    pub prefix_len: usize,
    /// 1-based call number across both phases.
    pub total_calls: usize,
}

/// `ceil(log2 n)`, zero for `n <= 1`.
#[must_use]
pub const fn estimate_calls(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// Counts oracle calls and reports each one to a progress sink.
pub struct Tracker<F> {
    estimate: usize,
    validate_calls: usize,
    bisect_calls: usize,
    sink: F,
}

impl<F: FnMut(&Progress)> Tracker<F> {
    #[must_use]
    pub const fn new(estimate: usize, sink: F) -> Self {
        Self {
            estimate,
            validate_calls: 0,
            bisect_calls: 0,
            sink,
        }
    }

    #[must_use]
    pub const fn estimate(&self) -> usize {
        self.estimate
    }

    /// Oracle calls issued so far across both phases.
    #[must_use]
    pub const fn calls(&self) -> usize {
        self.validate_calls + self.bisect_calls
    }

    #[must_use]
    pub const fn bisect_calls(&self) -> usize {
        self.bisect_calls
    }

    /// Report progress, then run one oracle call.
    ///
    /// # Errors
    ///
    /// Propagates the oracle's [`InfrastructureError`].
    pub fn evaluate<R: OracleRunner + ?Sized>(
        &mut self,
        oracle: &mut R,
        phase: Phase,
        units: &[Unit],
        assertion: Option<&Assertion>,
    ) -> Result<OracleOutcome, InfrastructureError> {
        let call = match phase {
            Phase::Validate => {
                self.validate_calls += 1;
                self.validate_calls
            }
            Phase::Bisect => {
                self.bisect_calls += 1;
                self.bisect_calls
            }
        };
        let total_calls = self.calls();
        (self.sink)(&Progress {
            phase,
            call,
            estimate: self.estimate,
            prefix_len: units.len(),
            total_calls,
        });
        oracle.evaluate(units, assertion)
    }
}
