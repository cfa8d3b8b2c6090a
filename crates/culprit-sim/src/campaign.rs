//! Campaign runner for deterministic simulation campaigns.
//!
//! Runs one simulated search per seed, checks its invariants, and records the
//! first failing seed for replay.

use std::ops::Range;

use anyhow::{Result, bail};
use culprit_core::{HuntReport, Progress, hunt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checker::{HuntChecker, Verdict};
use crate::scenario::Scenario;

/// Parameters shared by every seed of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Seeds to execute, e.g. `0..100`.
    pub seed_range: Range<u64>,
    /// Shortest generated sequence.
    pub min_len: usize,
    /// Longest generated sequence.
    pub max_len: usize,
    /// Share of scenarios signaling the fault through an assertion (percent).
    pub assertion_percent: u8,
    /// Share of scenarios with an injected infrastructure failure (percent).
    pub infrastructure_fault_percent: u8,
    /// Share of scenarios with a masking unit (percent).
    pub mask_percent: u8,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            seed_range: 0..100,
            min_len: 1,
            max_len: 256,
            assertion_percent: 50,
            infrastructure_fault_percent: 10,
            mask_percent: 10,
        }
    }
}

/// Upper limit on `max_len`; longer sequences only slow campaigns down.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

impl CampaignConfig {
    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.min_len == 0 {
            bail!("min_len must be > 0");
        }
        if self.max_len < self.min_len {
            bail!("max_len ({}) must be >= min_len ({})", self.max_len, self.min_len);
        }
        if self.max_len > MAX_SEQUENCE_LEN {
            bail!("max_len must be <= {MAX_SEQUENCE_LEN}");
        }
        for (name, percent) in [
            ("assertion_percent", self.assertion_percent),
            ("infrastructure_fault_percent", self.infrastructure_fault_percent),
            ("mask_percent", self.mask_percent),
        ] {
            if percent > 100 {
                bail!("{name} must be <= 100, got {percent}");
            }
        }
        Ok(())
    }
}

/// Failure details for a single seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    pub violations: Vec<String>,
}

/// Aggregate report produced by a campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    /// Non-monotonic scenarios, tolerated whatever they report.
    pub masked: usize,
    /// Masked scenarios whose answer was not the first cause.
    pub misplaced_by_mask: usize,
    /// Scenarios whose injected infrastructure failure was reached.
    pub infrastructure_aborts: usize,
    /// First seed that failed (for prioritized replay).
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
}

impl CampaignReport {
    /// True if every seed passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything observed while replaying one seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedTrace {
    pub scenario: Scenario,
    /// Present when the search completed.
    pub report: Option<HuntReport>,
    /// Present when the search aborted.
    pub error: Option<String>,
    /// Test-set length of every oracle call, in order.
    pub prefix_lengths: Vec<usize>,
    pub progress: Vec<Progress>,
    pub verdict: Verdict,
}

/// Run a full campaign across all seeds in the config.
///
/// # Errors
///
/// Returns an error if config validation fails.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        masked: 0,
        misplaced_by_mask: 0,
        infrastructure_aborts: 0,
        first_failure: None,
        failures: Vec::new(),
    };

    for seed in config.seed_range.clone() {
        report.seeds_run += 1;
        let trace = simulate(seed, config);
        if trace.error.is_some() && trace.scenario.infrastructure_fault_on.is_some() {
            report.infrastructure_aborts += 1;
        }

        match trace.verdict {
            Verdict::Passed => report.seeds_passed += 1,
            Verdict::Masked { misplaced } => {
                report.seeds_passed += 1;
                report.masked += 1;
                if misplaced {
                    report.misplaced_by_mask += 1;
                }
            }
            Verdict::Failed { violations } => {
                debug!(seed, violations = violations.len(), "seed failed");
                if report.first_failure.is_none() {
                    report.first_failure = Some(seed);
                }
                report.failures.push(SeedFailure {
                    seed,
                    violations: violations.iter().map(ToString::to_string).collect(),
                });
            }
        }
    }

    info!(
        seeds = report.seeds_run,
        passed = report.seeds_passed,
        masked = report.masked,
        failures = report.failures.len(),
        "campaign complete"
    );
    Ok(report)
}

/// Replay a single seed with full trace details for debugging.
///
/// # Errors
///
/// Returns an error when config validation fails.
pub fn replay_seed(seed: u64, config: &CampaignConfig) -> Result<DetailedTrace> {
    config.validate()?;
    Ok(simulate(seed, config))
}

fn simulate(seed: u64, config: &CampaignConfig) -> DetailedTrace {
    let scenario = Scenario::generate(seed, config);
    let sequence = scenario.sequence();
    let assertion = scenario.assertion();
    let mut oracle = scenario.oracle();
    let mut progress = Vec::new();

    let result = hunt(&sequence, assertion.as_ref(), &mut oracle, |p| {
        progress.push(*p);
    });
    let verdict = HuntChecker::check(&scenario, &result, oracle.calls());
    debug!(
        seed,
        len = scenario.len,
        cause = scenario.cause,
        calls = oracle.calls(),
        "seed simulated"
    );

    let (report, error) = match result {
        Ok(report) => (Some(report), None),
        Err(err) => (None, Some(err.to_string())),
    };
    DetailedTrace {
        scenario,
        report,
        error,
        prefix_lengths: oracle.prefix_lengths().to_vec(),
        progress,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn campaign_config_default_is_valid() {
        assert!(CampaignConfig::default().validate().is_ok());
    }

    #[test]
    fn campaign_config_empty_seed_range_rejected() {
        let config = CampaignConfig {
            seed_range: 5..5,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn campaign_config_bad_lengths_rejected() {
        for (min_len, max_len) in [(0, 10), (8, 4), (1, MAX_SEQUENCE_LEN + 1)] {
            let config = CampaignConfig {
                min_len,
                max_len,
                ..CampaignConfig::default()
            };
            assert!(config.validate().is_err(), "min={min_len} max={max_len}");
        }
    }

    #[test]
    fn campaign_config_percent_over_100_rejected() {
        let config = CampaignConfig {
            mask_percent: 101,
            ..CampaignConfig::default()
        };
        let err = config.validate().expect_err("invalid");
        assert!(err.to_string().contains("mask_percent"));
    }

    #[test]
    fn run_campaign_100_seeds_pass() {
        let report = run_campaign(&CampaignConfig::default()).expect("campaign");
        assert_eq!(report.seeds_run, 100);
        assert!(
            report.all_passed(),
            "campaign failed: {} failures, first at seed {:?}: {:?}",
            report.failures.len(),
            report.first_failure,
            report.failures.first(),
        );
        assert_eq!(report.seeds_passed, 100);
    }

    #[test]
    fn campaign_exercises_masks_and_infrastructure_faults() {
        let config = CampaignConfig {
            seed_range: 0..200,
            min_len: 8,
            max_len: 64,
            infrastructure_fault_percent: 30,
            mask_percent: 30,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign");
        assert!(report.all_passed(), "{:?}", report.failures.first());
        assert!(report.masked > 0, "expected some masked scenarios");
        assert!(report.infrastructure_aborts > 0, "expected some aborted searches");
    }

    #[test]
    fn replay_seed_produces_detailed_trace() {
        let config = CampaignConfig {
            min_len: 10,
            max_len: 10,
            infrastructure_fault_percent: 0,
            mask_percent: 0,
            ..CampaignConfig::default()
        };
        let trace = replay_seed(42, &config).expect("replay");
        assert_eq!(trace.scenario.len, 10);
        assert_eq!(trace.verdict, Verdict::Passed);
        assert_eq!(trace.prefix_lengths.len(), trace.progress.len());
        assert_eq!(trace.prefix_lengths[..2], [10, 0]);
        let report = trace.report.expect("search completed");
        assert_eq!(
            report.found().map(|(_, found)| found.index),
            Some(trace.scenario.cause)
        );
    }

    #[test]
    fn replay_is_deterministic() {
        let config = CampaignConfig::default();
        let first = replay_seed(7, &config).expect("replay 1");
        let second = replay_seed(7, &config).expect("replay 2");
        assert_eq!(first, second);
    }

    #[test]
    fn campaign_report_serializes_to_json() {
        let report = CampaignReport {
            seeds_run: 10,
            seeds_passed: 9,
            masked: 1,
            misplaced_by_mask: 1,
            infrastructure_aborts: 0,
            first_failure: Some(7),
            failures: vec![SeedFailure {
                seed: 7,
                violations: vec!["WrongCulprit: expected unit 3, got 4".into()],
            }],
        };
        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"seeds_run\":10"));
        assert!(json.contains("\"first_failure\":7"));
    }

    proptest! {
        #[test]
        fn any_seed_holds_its_invariants(seed in any::<u64>()) {
            let trace = replay_seed(seed, &CampaignConfig::default()).expect("replay");
            prop_assert!(!matches!(trace.verdict, Verdict::Failed { .. }), "{:?}", trace.verdict);
        }
    }
}
