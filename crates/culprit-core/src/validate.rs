use tracing::info;

use crate::error::{HuntError, PreconditionFailed};
use crate::oracle::OracleRunner;
use crate::progress::{Phase, Progress, Tracker};
use crate::unit::{Assertion, Sequence};

/// Bracket checks run once before bisection.
///
/// The full sequence must be faulted and the empty sequence must not be.
/// Neither check is retried.
///
/// # Errors
///
/// Returns [`PreconditionFailed`] when a bracket does not hold, or the
/// oracle's infrastructure error.
pub fn check_preconditions<R, F>(
    sequence: &Sequence,
    assertion: Option<&Assertion>,
    oracle: &mut R,
    tracker: &mut Tracker<F>,
) -> Result<(), HuntError>
where
    R: OracleRunner + ?Sized,
    F: FnMut(&Progress),
{
    let full = tracker.evaluate(oracle, Phase::Validate, sequence, assertion)?;
    if !full.faulted() {
        return Err(PreconditionFailed::NotReproduced { outcome: full }.into());
    }
    info!(units = sequence.len(), "fault reproduced with the full input");

    let empty = tracker.evaluate(oracle, Phase::Validate, &[], assertion)?;
    if empty.faulted() {
        return Err(PreconditionFailed::FaultWithoutInput { outcome: empty }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::TableOracle;

    fn run(oracle: &mut TableOracle, sequence: &Sequence) -> Result<(), HuntError> {
        let mut tracker = Tracker::new(0, |_: &Progress| {});
        check_preconditions(sequence, None, oracle, &mut tracker)
    }

    #[test]
    fn passes_when_full_faults_and_empty_is_clean() {
        let seq = Sequence::from_codes(["a", "b", "c"]);
        let mut oracle = TableOracle::faulting_at(1);
        run(&mut oracle, &seq).expect("preconditions hold");
        assert_eq!(oracle.prefix_lengths(), &[3, 0]);
    }

    #[test]
    fn unreproduced_fault_stops_after_one_call() {
        let seq = Sequence::from_codes(["a", "b"]);
        let mut oracle = TableOracle::new();
        let err = run(&mut oracle, &seq).expect_err("not reproduced");
        assert!(matches!(
            err,
            HuntError::Precondition(PreconditionFailed::NotReproduced { .. })
        ));
        assert_eq!(oracle.calls(), 1);
    }

    #[test]
    fn fault_on_empty_is_rejected() {
        let seq = Sequence::from_codes(["a"]);
        let mut oracle = TableOracle::faulting_at(0).with_fault_on_empty();
        let err = run(&mut oracle, &seq).expect_err("broken environment");
        match err {
            HuntError::Precondition(PreconditionFailed::FaultWithoutInput { outcome }) => {
                assert!(outcome.faulted());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn infrastructure_error_propagates() {
        let seq = Sequence::from_codes(["a"]);
        let mut oracle = TableOracle::faulting_at(0).with_failure_on_call(2);
        let err = run(&mut oracle, &seq).expect_err("infrastructure");
        assert!(matches!(err, HuntError::Infrastructure(_)));
    }
}
