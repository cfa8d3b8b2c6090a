//! Partition-and-test search for the first fault-triggering unit.
//!
//! # Algorithm
//!
//! The state is a [`Partition`] `(safe, head, tail)` of contiguous index
//! ranges. Each step runs `safe ++ head`:
//!
//! 1. Faulted with a non-empty tail: the cause lies in `head`; split `head`.
//! 2. Faulted with an empty tail: `head` is the single causal unit, at
//!    index `len(safe)`.
//! 3. Not faulted with a non-empty tail: `head` is safe; absorb it and split
//!    `tail`.
//! 4. Not faulted with an empty tail: nothing left to test; not found.
//!
//! The search assumes the fault is monotonic in the prefix: once the causal
//! unit is included, later units never hide the fault. That assumption is not
//! checked. If it does not hold, the reported index may be wrong.
//!
//! At most `ceil(log2 n) + 1` oracle calls are issued.

use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::error::InfrastructureError;
use crate::oracle::{OracleOutcome, OracleRunner};
use crate::progress::{Phase, Progress, Tracker};
use crate::split::split_range;
use crate::unit::{Assertion, Sequence};

/// Contiguous `(safe, head, tail)` ranges over the original sequence.
///
/// `safe.end == head.start` and `head.end == tail.start`. Units after
/// `tail.end` were excluded by a narrowing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub safe: Range<usize>,
    pub head: Range<usize>,
    pub tail: Range<usize>,
}

impl Partition {
    /// Nothing confirmed safe yet; the whole sequence split in two.
    #[must_use]
    pub fn initial(len: usize) -> Self {
        let (head, tail) = split_range(0..len);
        Self {
            safe: 0..0,
            head,
            tail,
        }
    }

    /// Range run by the next oracle call: `safe ++ head`.
    #[must_use]
    pub const fn test_set(&self) -> Range<usize> {
        self.safe.start..self.head.end
    }

    /// The cause lies within `head`.
    #[must_use]
    pub fn narrow(self) -> Self {
        let (head, tail) = split_range(self.head);
        Self {
            safe: self.safe,
            head,
            tail,
        }
    }

    /// `head` is confirmed safe; the cause lies within `tail`.
    #[must_use]
    pub fn widen(self) -> Self {
        let (head, tail) = split_range(self.tail);
        Self {
            safe: self.safe.start..self.head.end,
            head,
            tail,
        }
    }
}

/// The isolated cause and the outcome of the call that pinned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BisectionResult {
    /// Original position of the first unit that makes the fault reproducible.
    pub index: usize,
    pub outcome: OracleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bisection {
    Found(BisectionResult),
    NotFound,
}

/// Locate the first unit whose inclusion makes the oracle report a fault.
///
/// Strictly sequential: one oracle call at a time, each decided before the
/// next partition is chosen. An empty sequence is `NotFound` without any call.
///
/// # Errors
///
/// Returns the oracle's [`InfrastructureError`] as soon as it occurs; no
/// further calls are issued.
pub fn bisect<R, F>(
    sequence: &Sequence,
    assertion: Option<&Assertion>,
    oracle: &mut R,
    tracker: &mut Tracker<F>,
) -> Result<Bisection, InfrastructureError>
where
    R: OracleRunner + ?Sized,
    F: FnMut(&Progress),
{
    if sequence.is_empty() {
        return Ok(Bisection::NotFound);
    }

    let mut partition = Partition::initial(sequence.len());
    loop {
        debug_assert_eq!(partition.safe.end, partition.head.start);
        debug_assert_eq!(partition.head.end, partition.tail.start);

        let units = sequence.run(partition.test_set());
        let outcome = tracker.evaluate(oracle, Phase::Bisect, units, assertion)?;
        debug!(
            safe = partition.safe.len(),
            head = partition.head.len(),
            tail = partition.tail.len(),
            faulted = outcome.faulted(),
            "bisection step"
        );

        partition = match (outcome.faulted(), partition.tail.is_empty()) {
            (true, true) => {
                return Ok(Bisection::Found(BisectionResult {
                    index: partition.safe.end,
                    outcome,
                }));
            }
            (true, false) => partition.narrow(),
            (false, true) => return Ok(Bisection::NotFound),
            (false, false) => partition.widen(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Payload, TableOracle};
    use crate::progress::estimate_calls;
    use proptest::prelude::*;

    fn codes(n: usize) -> Sequence {
        Sequence::from_codes((0..n).map(|i| format!("unit {i}")))
    }

    fn run(sequence: &Sequence, oracle: &mut TableOracle) -> Result<Bisection, InfrastructureError> {
        let mut tracker = Tracker::new(estimate_calls(sequence.len()), |_: &Progress| {});
        bisect(sequence, None, oracle, &mut tracker)
    }

    fn found_index(bisection: &Bisection) -> Option<usize> {
        match bisection {
            Bisection::Found(result) => Some(result.index),
            Bisection::NotFound => None,
        }
    }

    #[test]
    fn partition_steps_keep_ranges_contiguous() {
        let p = Partition::initial(7);
        assert_eq!((p.safe.clone(), p.head.clone(), p.tail.clone()), (0..0, 0..4, 4..7));

        let widened = p.clone().widen();
        assert_eq!(widened.safe, 0..4);
        assert_eq!(widened.head, 4..6);
        assert_eq!(widened.tail, 6..7);
        assert_eq!(widened.test_set(), 0..6);

        let narrowed = p.narrow();
        assert_eq!(narrowed.safe, 0..0);
        assert_eq!(narrowed.head, 0..2);
        assert_eq!(narrowed.tail, 2..4);
    }

    #[test]
    fn empty_sequence_is_not_found_without_calls() {
        let mut oracle = TableOracle::faulting_at(0);
        let result = run(&Sequence::default(), &mut oracle).expect("bisect");
        assert_eq!(result, Bisection::NotFound);
        assert_eq!(oracle.calls(), 0);
    }

    #[test]
    fn singleton_is_one_direct_test() {
        let seq = codes(1);
        let mut oracle = TableOracle::faulting_at(0);
        assert_eq!(found_index(&run(&seq, &mut oracle).expect("bisect")), Some(0));
        assert_eq!(oracle.prefix_lengths(), &[1]);

        let mut clean = TableOracle::new();
        assert_eq!(run(&seq, &mut clean).expect("bisect"), Bisection::NotFound);
        assert_eq!(clean.calls(), 1);
    }

    #[test]
    fn finds_boundary_and_middle_causes() {
        for n in 1..=40 {
            for k in [0, n / 2, n - 1] {
                let mut oracle = TableOracle::faulting_at(k);
                let result = run(&codes(n), &mut oracle).expect("bisect");
                assert_eq!(found_index(&result), Some(k), "n={n} k={k}");
            }
        }
    }

    #[test]
    fn call_count_stays_within_log_bound() {
        for n in 1..=300 {
            for k in 0..n {
                let mut oracle = TableOracle::faulting_at(k);
                run(&codes(n), &mut oracle).expect("bisect");
                assert!(
                    oracle.calls() <= estimate_calls(n) + 1,
                    "n={n} k={k} calls={}",
                    oracle.calls()
                );
            }
        }
    }

    #[test]
    fn earliest_cause_wins_with_several_causes() {
        let mut oracle = TableOracle::faulting_at(9).with_cause(3).with_cause(12);
        let result = run(&codes(16), &mut oracle).expect("bisect");
        assert_eq!(found_index(&result), Some(3));
    }

    #[test]
    fn result_carries_outcome_of_the_pinning_call() {
        let mut oracle = TableOracle::faulting_at(5);
        let Bisection::Found(result) = run(&codes(8), &mut oracle).expect("bisect") else {
            panic!("expected a culprit");
        };
        assert!(result.outcome.faulted());
        assert!(matches!(
            result.outcome.payload(),
            Payload::Error(info) if info.message == "unit 5 raised an error"
        ));
        assert_eq!(oracle.prefix_lengths().last(), Some(&6));
    }

    #[test]
    fn infrastructure_failure_aborts_immediately() {
        for fail_on in 1..=4 {
            let mut oracle = TableOracle::faulting_at(11).with_failure_on_call(fail_on);
            let err = run(&codes(32), &mut oracle).expect_err("infrastructure error");
            assert!(matches!(err, InfrastructureError::Simulated { call } if call == fail_on));
            assert_eq!(oracle.calls(), fail_on, "no calls after the failure");
        }
    }

    proptest! {
        #[test]
        fn monotonic_fault_is_located((n, k) in (1_usize..2000).prop_flat_map(|n| (Just(n), 0..n))) {
            let mut oracle = TableOracle::faulting_at(k);
            let result = run(&codes(n), &mut oracle).expect("bisect");
            prop_assert_eq!(found_index(&result), Some(k));
            prop_assert!(oracle.calls() <= estimate_calls(n) + 1);
        }
    }
}
