//! Per-seed search scenarios.

use culprit_core::{Assertion, Sequence, TableOracle};
use serde::Serialize;

use crate::campaign::CampaignConfig;
use crate::rng::DeterministicRng;

/// How the simulated fault is signaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// The causal unit raises an error.
    Error,
    /// An assertion prints a truthy value once the causal unit has run.
    Assertion,
}

/// A later unit that hides the cause, followed by a second cause that
/// brings the fault back. Breaks the monotonicity the search relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Masking {
    pub mask: usize,
    pub second_cause: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub seed: u64,
    pub len: usize,
    pub cause: usize,
    pub mode: SignalMode,
    /// 1-based oracle call that fails with an infrastructure error.
    pub infrastructure_fault_on: Option<usize>,
    pub masking: Option<Masking>,
}

impl Scenario {
    /// Derive the scenario for `seed`. Deterministic in `(seed, config)`.
    #[must_use]
    pub fn generate(seed: u64, config: &CampaignConfig) -> Self {
        let mut rng = DeterministicRng::new(seed);
        let len = rng.in_range(config.min_len..config.max_len + 1);
        let cause = rng.in_range(0..len);
        let mode = if rng.chance(config.assertion_percent) {
            SignalMode::Assertion
        } else {
            SignalMode::Error
        };

        // Needs room for a mask and a second cause after the first one.
        let masking = (cause + 2 < len && rng.chance(config.mask_percent)).then(|| {
            let mask = rng.in_range(cause + 1..len - 1);
            let second_cause = rng.in_range(mask + 1..len);
            Masking { mask, second_cause }
        });

        let budget = call_bound(len);
        let infrastructure_fault_on = rng
            .chance(config.infrastructure_fault_percent)
            .then(|| rng.in_range(1..budget + 1));

        Self {
            seed,
            len,
            cause,
            mode,
            infrastructure_fault_on,
            masking,
        }
    }

    #[must_use]
    pub const fn is_monotonic(&self) -> bool {
        self.masking.is_none()
    }

    #[must_use]
    pub fn sequence(&self) -> Sequence {
        Sequence::from_codes((0..self.len).map(|i| format!("step {i}")))
    }

    #[must_use]
    pub fn assertion(&self) -> Option<Assertion> {
        match self.mode {
            SignalMode::Assertion => Some(Assertion::new("check fault")),
            SignalMode::Error => None,
        }
    }

    #[must_use]
    pub fn oracle(&self) -> TableOracle {
        let mut oracle = TableOracle::faulting_at(self.cause);
        if let Some(Masking { mask, second_cause }) = self.masking {
            oracle = oracle.with_mask(mask).with_cause(second_cause);
        }
        if let Some(call) = self.infrastructure_fault_on {
            oracle = oracle.with_failure_on_call(call);
        }
        oracle
    }
}

/// Most oracle calls a search over `len` units may issue: two bracket checks
/// plus `ceil(log2 len) + 1` bisection calls.
#[must_use]
pub const fn call_bound(len: usize) -> usize {
    culprit_core::progress::estimate_calls(len) + 3
}
