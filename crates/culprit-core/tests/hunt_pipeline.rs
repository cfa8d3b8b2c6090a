//! End-to-end searches through `hunt`, in memory and with a real shell.

use culprit_core::progress::estimate_calls;
use culprit_core::{
    Assertion, HuntError, HuntOutcome, OracleOutcome, Payload, PreconditionFailed, Sequence,
    TableOracle, hunt,
};

#[test]
fn four_units_cause_at_c() {
    let seq = Sequence::from_codes(["A", "B", "C", "D"]);
    let mut oracle = TableOracle::faulting_at(2);
    let report = hunt(&seq, None, &mut oracle, |_| {}).expect("hunt");

    let (unit, result) = report.found().expect("culprit");
    assert_eq!(result.index, 2);
    assert_eq!(unit.code(), "C");
    assert_eq!(
        result.outcome,
        OracleOutcome::error(Some(1), "unit 2 raised an error")
    );
}

#[test]
fn four_units_cause_at_c_with_assertion_payload() {
    let seq = Sequence::from_codes(["A", "B", "C", "D"]);
    let assertion = Assertion::new("check");
    let mut oracle = TableOracle::faulting_at(2);
    let report = hunt(&seq, Some(&assertion), &mut oracle, |_| {}).expect("hunt");

    let (_, result) = report.found().expect("culprit");
    assert_eq!(result.index, 2);
    assert_eq!(result.outcome, OracleOutcome::value("cause:2"));
}

#[test]
fn total_calls_are_bounded() {
    for n in [1_usize, 2, 3, 17, 64, 100, 1000] {
        for k in [0, n / 3, n - 1] {
            let seq = Sequence::from_codes((0..n).map(|i| i.to_string()));
            let mut oracle = TableOracle::faulting_at(k);
            let report = hunt(&seq, None, &mut oracle, |_| {}).expect("hunt");
            assert_eq!(report.found().map(|(_, r)| r.index), Some(k));
            // Two bracket checks plus at most ceil(log2 n) + 1 bisection calls.
            assert!(report.calls <= estimate_calls(n) + 3, "n={n} k={k}");
        }
    }
}

#[test]
fn empty_input_fails_its_precondition() {
    let mut oracle = TableOracle::faulting_at(0);
    let err = hunt(&Sequence::default(), None, &mut oracle, |_| {}).expect_err("nothing to run");
    assert!(matches!(
        err,
        HuntError::Precondition(PreconditionFailed::NotReproduced { .. })
    ));
}

#[test]
fn broken_environment_never_bisects() {
    let seq = Sequence::from_codes(["A", "B"]);
    let mut oracle = TableOracle::faulting_at(1).with_fault_on_empty();
    let err = hunt(&seq, None, &mut oracle, |_| {}).expect_err("broken");
    assert!(matches!(
        err,
        HuntError::Precondition(PreconditionFailed::FaultWithoutInput { .. })
    ));
    assert_eq!(oracle.prefix_lengths(), &[2, 0]);
}

#[test]
fn infrastructure_error_mid_search_stops_everything() {
    let seq = Sequence::from_codes((0..16).map(|i| i.to_string()));
    let mut oracle = TableOracle::faulting_at(9).with_failure_on_call(4);
    let err = hunt(&seq, None, &mut oracle, |_| {}).expect_err("infrastructure");
    assert!(matches!(err, HuntError::Infrastructure(_)));
    assert_eq!(oracle.calls(), 4);
}

#[cfg(unix)]
#[test]
fn real_shell_finds_the_failing_unit() {
    use culprit_core::ProcessOracle;
    use culprit_core::config::RunnerConfig;

    let seq = Sequence::from_codes([
        "A=1",
        "B=2",
        "echo 'C is broken' >&2; exit 9",
        "D=4",
    ]);
    let mut oracle = ProcessOracle::new(RunnerConfig::default());
    let report = hunt(&seq, None, &mut oracle, |_| {}).expect("hunt");

    match report.outcome {
        HuntOutcome::Found { unit, result } => {
            assert_eq!(result.index, 2);
            assert_eq!(unit.line(), 3);
            assert!(matches!(
                result.outcome.payload(),
                Payload::Error(info) if info.exit_code == Some(9) && info.message.contains("C is broken")
            ));
        }
        HuntOutcome::Inconclusive => panic!("expected a culprit"),
    }
}

#[cfg(unix)]
#[test]
fn real_shell_with_assertion_sees_state_from_earlier_units() {
    use culprit_core::ProcessOracle;
    use culprit_core::config::RunnerConfig;

    let seq = Sequence::from_codes([
        "PATH_EXTRA=/opt/a",
        "LEVEL=1",
        "LEVEL=$((LEVEL + 1))",
        "LEVEL=$((LEVEL + 1))",
        "NAME=done",
    ]);
    let assertion = Assertion::new("if [ \"$LEVEL\" -ge 3 ]; then echo \"level $LEVEL\"; fi");
    let mut oracle = ProcessOracle::new(RunnerConfig::default());
    let report = hunt(&seq, Some(&assertion), &mut oracle, |_| {}).expect("hunt");

    let (_, result) = report.found().expect("culprit");
    assert_eq!(result.index, 3);
    assert_eq!(result.outcome, OracleOutcome::value("level 3"));
}
