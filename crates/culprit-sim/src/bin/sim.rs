#![forbid(unsafe_code)]

use anyhow::{Result, bail};
use culprit_sim::{CampaignConfig, run_campaign};

fn main() -> Result<()> {
    let report = run_campaign(&CampaignConfig::default())?;

    println!(
        "simulation complete: seeds={} passed={} masked={} infrastructure_aborts={}",
        report.seeds_run, report.seeds_passed, report.masked, report.infrastructure_aborts
    );

    if let Some(seed) = report.first_failure {
        bail!(
            "{} seed(s) failed; replay with `culprit dev sim replay --seed {seed}`",
            report.failures.len()
        );
    }
    Ok(())
}
