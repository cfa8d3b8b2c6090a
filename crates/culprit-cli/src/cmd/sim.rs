//! `culprit dev sim`: seeded campaigns against the in-memory oracle.
//!
//! `run` checks many seeds and exits non-zero when any seed breaks an
//! invariant; `replay` reruns one seed and prints every oracle call.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};
use culprit_sim::{
    CampaignConfig, CampaignReport, DetailedTrace, Verdict, replay_seed, run_campaign,
};
use serde::Serialize;

use crate::output::{OutputMode, emit, field, heading};
use crate::report::describe_payload;

/// Failures listed before the rest are summarized.
const FAILURE_SAMPLE: usize = 5;

#[derive(Args, Debug)]
pub struct SimArgs {
    #[command(subcommand)]
    pub command: SimCommand,
}

#[derive(Subcommand, Debug)]
pub enum SimCommand {
    #[command(
        about = "Run a simulation campaign across many seeds",
        long_about = "Generate one scenario per seed (sequence length, cause, signal mode, optional\n\
                      masking unit and injected infrastructure failure), hunt it with the in-memory\n\
                      oracle, and check the result. Exits 1 if any seed breaks an invariant.",
        after_help = "EXAMPLES:\n    # 500 seeds with defaults\n    culprit dev sim run --seeds 500\n\n\
                      # Long sequences, many non-monotonic scenarios\n    culprit dev sim run --max-len 4096 --masks 40\n\n\
                      # Machine-readable summary\n    culprit dev sim run --format json"
    )]
    Run(SimRunArgs),

    #[command(
        about = "Replay one seed and show every oracle call",
        long_about = "Regenerate the scenario for SEED with the same knobs as the campaign that\n\
                      produced it, then print the hunt result, each test-set length and any\n\
                      invariant violations.",
        after_help = "EXAMPLES:\n    # Replay seed 42\n    culprit dev sim replay --seed 42\n\n\
                      # Same knobs as the campaign that failed\n    culprit dev sim replay --seed 42 --max-len 4096 --masks 40"
    )]
    Replay(SimReplayArgs),
}

/// Scenario knobs shared by `run` and `replay`.
#[derive(Args, Debug)]
pub struct ScenarioArgs {
    /// Shortest generated sequence.
    #[arg(long, default_value_t = 1)]
    pub min_len: usize,

    /// Longest generated sequence.
    #[arg(long, default_value_t = 256)]
    pub max_len: usize,

    /// Percent of scenarios signaling the fault through an assertion.
    #[arg(long, value_name = "PCT", default_value_t = 50)]
    pub assertions: u8,

    /// Percent of scenarios with a masking unit (non-monotonic fault).
    #[arg(long, value_name = "PCT", default_value_t = 10)]
    pub masks: u8,

    /// Percent of scenarios with an injected infrastructure failure.
    #[arg(long, value_name = "PCT", default_value_t = 10)]
    pub infra_faults: u8,
}

impl ScenarioArgs {
    fn config(&self, first_seed: u64, seeds: u64) -> CampaignConfig {
        CampaignConfig {
            seed_range: first_seed..first_seed.saturating_add(seeds),
            min_len: self.min_len,
            max_len: self.max_len,
            assertion_percent: self.assertions,
            infrastructure_fault_percent: self.infra_faults,
            mask_percent: self.masks,
        }
    }
}

#[derive(Args, Debug)]
pub struct SimRunArgs {
    /// Number of seeds to run.
    #[arg(long, default_value_t = 100)]
    pub seeds: u64,

    /// First seed of the campaign.
    #[arg(long, default_value_t = 0)]
    pub seed_start: u64,

    #[command(flatten)]
    pub scenario: ScenarioArgs,
}

#[derive(Args, Debug)]
pub struct SimReplayArgs {
    #[arg(long)]
    pub seed: u64,

    #[command(flatten)]
    pub scenario: ScenarioArgs,
}

#[derive(Debug, Serialize)]
struct CampaignSummary<'a> {
    #[serde(flatten)]
    report: &'a CampaignReport,
    seeds_failed: usize,
    all_passed: bool,
    #[serde(skip)]
    config: &'a CampaignConfig,
}

fn campaign_text(summary: &CampaignSummary<'_>, w: &mut dyn Write) -> io::Result<()> {
    let (report, config) = (summary.report, summary.config);
    writeln!(
        w,
        "campaign seeds_run={} min_len={} max_len={} masks_pct={} infra_faults_pct={}",
        report.seeds_run,
        config.min_len,
        config.max_len,
        config.mask_percent,
        config.infrastructure_fault_percent
    )?;
    writeln!(
        w,
        "results passed={} failed={} masked={} misplaced_by_mask={} infrastructure_aborts={} all_passed={}",
        report.seeds_passed,
        summary.seeds_failed,
        report.masked,
        report.misplaced_by_mask,
        report.infrastructure_aborts,
        summary.all_passed
    )?;
    for failure in report.failures.iter().take(FAILURE_SAMPLE) {
        writeln!(w, "failure seed={} violations={}", failure.seed, failure.violations.join("; "))?;
    }
    if let Some(seed) = report.first_failure {
        writeln!(w, "hint replay_seed={seed}")?;
    }
    Ok(())
}

fn campaign_pretty(summary: &CampaignSummary<'_>, w: &mut dyn Write) -> io::Result<()> {
    let (report, config) = (summary.report, summary.config);
    heading(w, "Simulation Campaign")?;
    field(w, "Seeds", report.seeds_run.to_string())?;
    field(w, "Lengths", format!("{}..={}", config.min_len, config.max_len))?;
    field(
        w,
        "Passed",
        format!("{} of {}", report.seeds_passed, report.seeds_run),
    )?;
    field(
        w,
        "Masked",
        format!("{} ({} misplaced)", report.masked, report.misplaced_by_mask),
    )?;
    field(w, "Aborts", report.infrastructure_aborts.to_string())?;

    let Some(first) = report.first_failure else {
        return field(w, "Status", "all seeds passed");
    };
    field(w, "Status", format!("{} seeds failed", summary.seeds_failed))?;
    writeln!(w)?;
    heading(w, "Failures")?;
    for failure in report.failures.iter().take(FAILURE_SAMPLE) {
        writeln!(w, "seed {}", failure.seed)?;
        for violation in &failure.violations {
            writeln!(w, "  - {violation}")?;
        }
    }
    let hidden = report.failures.len().saturating_sub(FAILURE_SAMPLE);
    if hidden > 0 {
        writeln!(w, "  ({hidden} more)")?;
    }
    writeln!(w)?;
    field(w, "Replay", format!("culprit dev sim replay --seed {first}"))
}

/// Execute `culprit dev sim run`.
///
/// # Errors
///
/// Returns an error if the campaign knobs are invalid or output fails.
pub fn run_sim_run(args: &SimRunArgs, output: OutputMode) -> Result<ExitCode> {
    let config = args.scenario.config(args.seed_start, args.seeds);
    let report = run_campaign(&config)?;
    let summary = CampaignSummary {
        report: &report,
        seeds_failed: report.failures.len(),
        all_passed: report.all_passed(),
        config: &config,
    };
    emit(
        &mut io::stdout().lock(),
        output,
        &summary,
        campaign_text,
        campaign_pretty,
    )?;

    Ok(if summary.all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn hunt_result(trace: &DetailedTrace) -> String {
    match (&trace.report, &trace.error) {
        (Some(report), _) => report.found().map_or_else(
            || format!("inconclusive after {} calls", report.calls),
            |(_, found)| {
                format!(
                    "unit {} after {} calls: {}",
                    found.index,
                    report.calls,
                    describe_payload(found.outcome.payload())
                )
            },
        ),
        (None, Some(error)) => format!("aborted: {error}"),
        (None, None) => "not run".to_string(),
    }
}

fn replay_text(trace: &DetailedTrace, w: &mut dyn Write) -> io::Result<()> {
    let s = &trace.scenario;
    write!(
        w,
        "replay seed={} len={} cause={} mode={:?}",
        s.seed, s.len, s.cause, s.mode
    )?;
    if let Some(m) = s.masking {
        write!(w, " mask={} second_cause={}", m.mask, m.second_cause)?;
    }
    if let Some(call) = s.infrastructure_fault_on {
        write!(w, " infra_fault_on={call}")?;
    }
    writeln!(w)?;
    for (i, len) in trace.prefix_lengths.iter().enumerate() {
        writeln!(w, "call n={} prefix_len={len}", i + 1)?;
    }
    writeln!(w, "result {}", hunt_result(trace))?;
    writeln!(w, "verdict {:?}", trace.verdict)
}

fn replay_pretty(trace: &DetailedTrace, w: &mut dyn Write) -> io::Result<()> {
    let s = &trace.scenario;
    heading(w, &format!("Replay Seed {}", s.seed))?;
    field(w, "Length", s.len.to_string())?;
    field(w, "Cause", s.cause.to_string())?;
    field(w, "Mode", format!("{:?}", s.mode))?;
    if let Some(m) = s.masking {
        field(
            w,
            "Masking",
            format!("mask at {}, second cause at {}", m.mask, m.second_cause),
        )?;
    }
    if let Some(call) = s.infrastructure_fault_on {
        field(w, "Infra fault", format!("on call {call}"))?;
    }
    field(w, "Result", hunt_result(trace))?;

    writeln!(w)?;
    heading(w, "Oracle Calls")?;
    for (i, len) in trace.prefix_lengths.iter().enumerate() {
        writeln!(w, "{:>4}  {len} units", i + 1)?;
    }

    if let Verdict::Failed { violations } = &trace.verdict {
        writeln!(w)?;
        heading(w, "Invariant Violations")?;
        for violation in violations {
            writeln!(w, "- {violation}")?;
        }
    }
    Ok(())
}

/// Execute `culprit dev sim replay`.
///
/// # Errors
///
/// Returns an error if the campaign knobs are invalid or output fails.
pub fn run_sim_replay(args: &SimReplayArgs, output: OutputMode) -> Result<ExitCode> {
    let config = args.scenario.config(args.seed, 1);
    let trace = replay_seed(args.seed, &config)?;
    emit(
        &mut io::stdout().lock(),
        output,
        &trace,
        replay_text,
        replay_pretty,
    )?;

    Ok(if matches!(trace.verdict, Verdict::Failed { .. }) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Dispatch `culprit dev sim` subcommands.
///
/// # Errors
///
/// Propagates errors from the selected subcommand.
pub fn run_sim(args: &SimArgs, output: OutputMode) -> Result<ExitCode> {
    match &args.command {
        SimCommand::Run(run_args) => run_sim_run(run_args, output),
        SimCommand::Replay(replay_args) => run_sim_replay(replay_args, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use culprit_sim::SeedFailure;

    fn render(summary: &CampaignSummary<'_>, pretty: bool) -> String {
        let mut buf = Vec::new();
        if pretty {
            campaign_pretty(summary, &mut buf).expect("write");
        } else {
            campaign_text(summary, &mut buf).expect("write");
        }
        String::from_utf8(buf).expect("utf8")
    }

    fn failing_report() -> CampaignReport {
        CampaignReport {
            seeds_run: 8,
            seeds_passed: 7,
            masked: 1,
            misplaced_by_mask: 1,
            infrastructure_aborts: 2,
            first_failure: Some(5),
            failures: vec![SeedFailure {
                seed: 5,
                violations: vec!["reported unit 3, expected 2".to_string()],
            }],
        }
    }

    #[test]
    fn failing_campaign_points_at_replay() {
        let report = failing_report();
        let config = CampaignConfig::default();
        let summary = CampaignSummary {
            report: &report,
            seeds_failed: 1,
            all_passed: false,
            config: &config,
        };

        let text = render(&summary, false);
        assert!(text.contains("failed=1"));
        assert!(text.contains("failure seed=5 violations=reported unit 3, expected 2"));
        assert!(text.ends_with("hint replay_seed=5\n"));

        let pretty = render(&summary, true);
        assert!(pretty.contains("culprit dev sim replay --seed 5"));
        assert!(pretty.contains("  - reported unit 3"));
    }

    #[test]
    fn summary_json_flattens_report() {
        let report = failing_report();
        let config = CampaignConfig::default();
        let summary = CampaignSummary {
            report: &report,
            seeds_failed: 1,
            all_passed: false,
            config: &config,
        };
        let json = serde_json::to_value(&summary).expect("json");
        assert_eq!(json["seeds_run"], 8);
        assert_eq!(json["first_failure"], 5);
        assert_eq!(json["all_passed"], false);
        assert!(json.get("config").is_none());
    }

    #[test]
    fn replay_text_lists_every_call() {
        let config = CampaignConfig::default();
        let trace = replay_seed(11, &config).expect("replay");
        let mut buf = Vec::new();
        replay_text(&trace, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("replay seed=11 "));
        let calls = text.lines().filter(|l| l.starts_with("call n=")).count();
        assert_eq!(calls, trace.prefix_lengths.len());
        assert!(text.contains("\nresult "));
    }
}
