//! Progress and final-report rendering for `culprit hunt`.

use std::io::{self, Write};
use std::path::Path;

use culprit_core::{HuntOutcome, HuntReport, Payload, Phase, Progress};
use serde::Serialize;

use crate::output::{OutputMode, emit, field, heading};

/// Prints one progress line per oracle call to stderr.
pub struct ProgressPrinter {
    enabled: bool,
}

impl ProgressPrinter {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn show(&self, progress: &Progress) {
        if !self.enabled {
            return;
        }
        let mut err = io::stderr().lock();
        // A closed stderr must not abort the search.
        let _ = writeln!(err, "{}", progress_line(progress));
    }
}

fn progress_line(progress: &Progress) -> String {
    match progress.phase {
        Phase::Validate if progress.call == 1 => {
            format!("Checking: full input ({} units)", progress.prefix_len)
        }
        Phase::Validate => "Checking: empty input".to_string(),
        Phase::Bisect => format!(
            "Testing: {}/{} ({} units)",
            progress.call, progress.estimate, progress.prefix_len
        ),
    }
}

/// One-line rendering of an oracle payload.
pub fn describe_payload(payload: &Payload) -> String {
    match payload {
        Payload::Error(info) => {
            let status = info
                .exit_code
                .map_or_else(|| "killed".to_string(), |code| format!("exit {code}"));
            let message = info.message.lines().last().unwrap_or_default().trim();
            if message.is_empty() {
                format!("error ({status})")
            } else {
                format!("error ({status}): {message}")
            }
        }
        Payload::Value { value } => format!("assertion returned {value:?}"),
        Payload::Clean => "no error".to_string(),
    }
}

#[derive(Debug, Serialize)]
struct ReportOutput<'a> {
    file: &'a Path,
    #[serde(flatten)]
    report: &'a HuntReport,
}

const INCONCLUSIVE_EXPLANATION: &str = "The full input reproduced the problem, but no single unit could be \
     isolated. The search assumes that once the problem appears, adding later units never makes it \
     disappear, and that every run behaves the same. One of these does not hold for this input.";

/// Render the final report to stdout.
pub fn render_report(report: &HuntReport, file: &Path, mode: OutputMode) -> anyhow::Result<()> {
    let out = ReportOutput { file, report };
    emit(&mut io::stdout().lock(), mode, &out, write_text, write_pretty)
}

fn write_text(out: &ReportOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    let report = out.report;
    match &report.outcome {
        HuntOutcome::Found { unit, result } => {
            writeln!(
                w,
                "found file={} index={} line={} calls={} estimate={}",
                out.file.display(),
                result.index,
                unit.line(),
                report.calls,
                report.estimate
            )?;
            writeln!(w, "unit {}", unit.summary())?;
            writeln!(w, "outcome {}", describe_payload(result.outcome.payload()))
        }
        HuntOutcome::Inconclusive => {
            writeln!(
                w,
                "inconclusive file={} calls={}",
                out.file.display(),
                report.calls
            )?;
            writeln!(w, "hint {INCONCLUSIVE_EXPLANATION}")
        }
    }
}

fn write_pretty(out: &ReportOutput<'_>, w: &mut dyn Write) -> io::Result<()> {
    let report = out.report;
    match &report.outcome {
        HuntOutcome::Found { unit, result } => {
            heading(w, "Culprit Found")?;
            field(w, "File", format!("{}:{}", out.file.display(), unit.line()))?;
            field(w, "Unit", format!("#{}", result.index + 1))?;
            field(w, "Outcome", describe_payload(result.outcome.payload()))?;
            field(
                w,
                "Calls",
                format!("{} (estimated {})", report.calls, report.estimate),
            )?;
            writeln!(w)?;
            for line in unit.code().lines() {
                writeln!(w, "    {line}")?;
            }
            Ok(())
        }
        HuntOutcome::Inconclusive => {
            heading(w, "Inconclusive")?;
            field(w, "File", out.file.display().to_string())?;
            field(w, "Calls", report.calls.to_string())?;
            writeln!(w)?;
            writeln!(w, "{INCONCLUSIVE_EXPLANATION}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use culprit_core::{BisectionResult, OracleOutcome, Unit};

    fn found_report() -> HuntReport {
        HuntReport {
            outcome: HuntOutcome::Found {
                unit: Unit::new(2, 7, "echo broken >&2\nexit 3"),
                result: BisectionResult {
                    index: 2,
                    outcome: OracleOutcome::error(Some(3), "broken\n"),
                },
            },
            calls: 5,
            estimate: 2,
        }
    }

    fn text_of(report: &HuntReport, pretty: bool) -> String {
        let out = ReportOutput {
            file: Path::new("units.sh"),
            report,
        };
        let mut buf = Vec::new();
        if pretty {
            write_pretty(&out, &mut buf).expect("write");
        } else {
            write_text(&out, &mut buf).expect("write");
        }
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn progress_lines_name_the_phase() {
        let mut p = Progress {
            phase: Phase::Validate,
            call: 1,
            estimate: 3,
            prefix_len: 8,
            total_calls: 1,
        };
        assert_eq!(progress_line(&p), "Checking: full input (8 units)");
        p.call = 2;
        assert_eq!(progress_line(&p), "Checking: empty input");
        p.phase = Phase::Bisect;
        p.call = 1;
        p.prefix_len = 4;
        assert_eq!(progress_line(&p), "Testing: 1/3 (4 units)");
    }

    #[test]
    fn payload_descriptions() {
        assert_eq!(
            describe_payload(OracleOutcome::error(Some(3), "warn\nboom\n").payload()),
            "error (exit 3): boom"
        );
        assert_eq!(
            describe_payload(OracleOutcome::error(None, "").payload()),
            "error (killed)"
        );
        assert_eq!(
            describe_payload(OracleOutcome::value("yes").payload()),
            "assertion returned \"yes\""
        );
    }

    #[test]
    fn text_report_for_found_unit() {
        let text = text_of(&found_report(), false);
        assert!(text.starts_with("found file=units.sh index=2 line=7 calls=5 estimate=2\n"));
        assert!(text.contains("unit echo broken >&2 ..."));
        assert!(text.contains("outcome error (exit 3): broken"));
    }

    #[test]
    fn pretty_report_shows_location_and_code() {
        let text = text_of(&found_report(), true);
        assert!(text.contains("Culprit Found"));
        assert!(text.contains("units.sh:7"));
        assert!(text.contains("    exit 3"));
    }

    #[test]
    fn inconclusive_report_explains_assumption() {
        let report = HuntReport {
            outcome: HuntOutcome::Inconclusive,
            calls: 4,
            estimate: 1,
        };
        let text = text_of(&report, false);
        assert!(text.starts_with("inconclusive file=units.sh calls=4"));
        assert!(text.contains("every run behaves the same"));
    }

    #[test]
    fn json_report_flattens_hunt_report() {
        let report = found_report();
        let out = ReportOutput {
            file: Path::new("units.sh"),
            report: &report,
        };
        let json = serde_json::to_value(&out).expect("json");
        assert_eq!(json["file"], "units.sh");
        assert_eq!(json["outcome"]["status"], "found");
        assert_eq!(json["outcome"]["result"]["index"], 2);
        assert_eq!(json["outcome"]["unit"]["line"], 7);
        assert_eq!(json["calls"], 5);
    }
}
