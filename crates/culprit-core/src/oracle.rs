//! The oracle seam: run a test set and report whether the fault is present.
//!
//! [`OracleRunner`] is the single pluggable boundary between the search and
//! its environment. The production implementation lives in
//! [`crate::runner`]; [`TableOracle`] evaluates in-process against a table of
//! causal positions and is what the search tests and the simulator use.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::InfrastructureError;
use crate::unit::{Assertion, Unit};

// ── Outcome types ────────────────────────────────────────────────────────────

/// Details of an error raised by a unit or by the assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Process exit code, `None` when terminated by a signal or simulated.
    pub exit_code: Option<i32>,
    /// Captured diagnostic text (tail of stderr, or a synthesized message).
    pub message: String,
}

/// What an oracle call observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// An error was raised while running the units or the assertion.
    Error(ErrorInfo),
    /// The assertion ran to completion and printed this value.
    Value { value: String },
    /// No assertion was given and nothing failed.
    Clean,
}

/// Verdict of one oracle call.
///
/// Only constructible through [`OracleOutcome::error`],
/// [`OracleOutcome::value`] and [`OracleOutcome::clean`], so `faulted`
/// always agrees with the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleOutcome {
    faulted: bool,
    payload: Payload,
}

impl OracleOutcome {
    /// A captured error. Always a fault.
    #[must_use]
    pub fn error(exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            faulted: true,
            payload: Payload::Error(ErrorInfo {
                exit_code,
                message: message.into(),
            }),
        }
    }

    /// A completed assertion; faulted iff the value is truthy.
    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            faulted: is_truthy(&value),
            payload: Payload::Value { value },
        }
    }

    /// Nothing failed and there was no assertion to evaluate.
    #[must_use]
    pub const fn clean() -> Self {
        Self {
            faulted: false,
            payload: Payload::Clean,
        }
    }

    #[must_use]
    pub const fn faulted(&self) -> bool {
        self.faulted
    }

    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// Whether an assertion value signals the fault.
///
/// Falsy values are the empty string, `false` and `nil` (case-insensitive,
/// surrounding whitespace ignored). Everything else is truthy.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("nil"))
}

// ── Runner seam ──────────────────────────────────────────────────────────────

/// Capability to execute a test set in a fresh, isolated environment.
pub trait OracleRunner {
    /// Run `units` in order, then `assertion` if present, and report the verdict.
    ///
    /// Faults raised by the code under test are returned inside the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureError`] only when the environment itself fails:
    /// it cannot be started, its transport breaks, or it exceeds its time budget.
    fn evaluate(
        &mut self,
        units: &[Unit],
        assertion: Option<&Assertion>,
    ) -> Result<OracleOutcome, InfrastructureError>;
}

impl<R: OracleRunner + ?Sized> OracleRunner for &mut R {
    fn evaluate(
        &mut self,
        units: &[Unit],
        assertion: Option<&Assertion>,
    ) -> Result<OracleOutcome, InfrastructureError> {
        (**self).evaluate(units, assertion)
    }
}

// ── In-memory runner ─────────────────────────────────────────────────────────

/// In-process oracle driven by a table of causal unit positions.
///
/// A test set is faulted when it includes a causal index that no included
/// masking index follows. With an assertion the verdict is reported as a value payload,
/// otherwise as an error payload.
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    causes: BTreeSet<usize>,
    masks: BTreeSet<usize>,
    fault_on_empty: bool,
    fail_on_call: Option<usize>,
    prefix_lengths: Vec<usize>,
}

impl TableOracle {
    /// Oracle with no causal unit: nothing ever faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle whose fault is caused by the unit at `index`.
    #[must_use]
    pub fn faulting_at(index: usize) -> Self {
        Self::new().with_cause(index)
    }

    #[must_use]
    pub fn with_cause(mut self, index: usize) -> Self {
        self.causes.insert(index);
        self
    }

    /// Including the unit at `index` hides every earlier cause (non-monotonic input).
    #[must_use]
    pub fn with_mask(mut self, index: usize) -> Self {
        self.masks.insert(index);
        self
    }

    /// Report a fault even for the empty test set.
    #[must_use]
    pub fn with_fault_on_empty(mut self) -> Self {
        self.fault_on_empty = true;
        self
    }

    /// Fail with an infrastructure error on the given 1-based call.
    #[must_use]
    pub fn with_failure_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Number of `evaluate` calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.prefix_lengths.len()
    }

    /// Length of every test set received, in call order.
    #[must_use]
    pub fn prefix_lengths(&self) -> &[usize] {
        &self.prefix_lengths
    }

    /// First included cause not hidden by an included mask placed after it.
    fn first_cause_in(&self, units: &[Unit]) -> Option<usize> {
        let last_mask = units
            .iter()
            .map(Unit::index)
            .filter(|index| self.masks.contains(index))
            .max();
        units
            .iter()
            .map(Unit::index)
            .filter(|index| self.causes.contains(index))
            .find(|cause| last_mask.is_none_or(|mask| mask < *cause))
    }
}

impl OracleRunner for TableOracle {
    fn evaluate(
        &mut self,
        units: &[Unit],
        assertion: Option<&Assertion>,
    ) -> Result<OracleOutcome, InfrastructureError> {
        self.prefix_lengths.push(units.len());
        let call = self.prefix_lengths.len();
        if self.fail_on_call == Some(call) {
            return Err(InfrastructureError::Simulated { call });
        }

        let cause = self.first_cause_in(units);
        let empty_fault = units.is_empty() && self.fault_on_empty;

        let outcome = match (cause, assertion) {
            (Some(index), Some(_)) => OracleOutcome::value(format!("cause:{index}")),
            (Some(index), None) => {
                OracleOutcome::error(Some(1), format!("unit {index} raised an error"))
            }
            (None, Some(_)) if empty_fault => OracleOutcome::value("broken"),
            (None, None) if empty_fault => OracleOutcome::error(Some(1), "environment broken"),
            (None, Some(_)) => OracleOutcome::value(""),
            (None, None) => OracleOutcome::clean(),
        };
        Ok(outcome)
    }
}
