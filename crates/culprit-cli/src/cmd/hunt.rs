//! `culprit hunt` and `culprit startup`: bisect a file of units.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use culprit_core::config::{Config, SplitMode, resolve_config};
use culprit_core::{Assertion, ErrorCode, HuntOutcome, ProcessOracle, Sequence, hunt};
use tracing::{info, warn};

use crate::output::{CliError, OutputMode};
use crate::reader::read_units;
use crate::report::{ProgressPrinter, render_report};
use crate::{EXIT_FATAL, EXIT_INCONCLUSIVE, GlobalOpts};

/// How a file is cut into units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SplitArg {
    /// Blank-line separated blocks.
    Blocks,
    /// One unit per line.
    Lines,
}

impl From<SplitArg> for SplitMode {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Blocks => Self::Blocks,
            SplitArg::Lines => Self::Lines,
        }
    }
}

/// Options shared by every command that runs a search.
#[derive(Args, Debug, Default)]
pub struct SearchOpts {
    /// Assertion code; the problem is present when it prints a truthy value.
    #[arg(long = "assert", value_name = "CODE", group = "assertion_source")]
    pub assert: Option<String>,

    /// Read the assertion code from a file.
    #[arg(long, value_name = "PATH", group = "assertion_source")]
    pub assert_file: Option<PathBuf>,

    /// Ask for the assertion on stdin.
    #[arg(long, group = "assertion_source")]
    pub prompt: bool,

    /// How to cut the file into units (overrides `input.split`).
    #[arg(long, value_enum)]
    pub split: Option<SplitArg>,

    /// Seconds allowed per isolated run (overrides `runner.timeout_secs`).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Interpreter that runs each test set (overrides `runner.program`).
    #[arg(long, value_name = "PROGRAM")]
    pub program: Option<String>,

    /// Interpreter argument, repeatable (replaces `runner.args`).
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl SearchOpts {
    fn apply(&self, config: &mut Config) {
        if let Some(split) = self.split {
            config.input.split = split.into();
        }
        if let Some(timeout) = self.timeout {
            config.runner.timeout_secs = timeout;
        }
        if let Some(program) = &self.program {
            config.runner.program.clone_from(program);
        }
        if !self.args.is_empty() {
            config.runner.args.clone_from(&self.args);
        }
    }

    fn assertion(&self) -> Result<Option<Assertion>> {
        let code = if let Some(code) = &self.assert {
            Some(code.clone())
        } else if let Some(path) = &self.assert_file {
            let code = fs::read_to_string(path)
                .with_context(|| format!("Failed to read assertion file {}", path.display()))?;
            Some(code)
        } else if self.prompt {
            prompt_assertion(&mut io::stdin().lock(), &mut io::stderr())?
        } else {
            None
        };
        Ok(code
            .filter(|code| !code.trim().is_empty())
            .map(Assertion::new))
    }
}

/// Arguments for `culprit hunt`.
#[derive(Args, Debug)]
pub struct HuntArgs {
    /// File whose units are bisected.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub search: SearchOpts,
}

/// Arguments for `culprit startup`.
#[derive(Args, Debug)]
pub struct StartupArgs {
    #[command(flatten)]
    pub search: SearchOpts,
}

fn prompt_assertion(input: &mut dyn BufRead, out: &mut dyn Write) -> Result<Option<String>> {
    write!(
        out,
        "Provide an assertion that prints a truthy value when the problem is present\n\
         (leave empty to look for an error instead): "
    )?;
    out.flush()?;
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read the assertion from stdin")?;
    let line = line.trim();
    Ok((!line.is_empty()).then(|| line.to_string()))
}

/// Report a fatal condition and map it to the fatal exit code.
fn fatal(output: OutputMode, error: &CliError) -> Result<ExitCode> {
    error.report(output)?;
    Ok(ExitCode::from(EXIT_FATAL))
}

fn load_config(global: &GlobalOpts, search: &SearchOpts, project_root: &Path) -> Result<Config> {
    let mut config = resolve_config(project_root, global.config.as_deref())?;
    search.apply(&mut config);
    config.runner.validate()?;
    Ok(config)
}

fn run_search(
    file: &Path,
    config: Config,
    search: &SearchOpts,
    global: &GlobalOpts,
    output: OutputMode,
) -> Result<ExitCode> {
    let text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(err) => {
            let detail = format!("Failed to read {}: {err}", file.display());
            return fatal(output, &CliError::coded(ErrorCode::InputReadFailed, detail));
        }
    };
    let assertion = match search.assertion() {
        Ok(assertion) => assertion,
        Err(err) => {
            return fatal(
                output,
                &CliError::coded(ErrorCode::InputReadFailed, format!("{err:#}")),
            );
        }
    };

    let sequence = Sequence::new(read_units(
        &text,
        config.input.split,
        &config.input.comment_prefix,
    ));
    if sequence.is_empty() {
        warn!(file = %file.display(), "no units found");
    }
    info!(
        file = %file.display(),
        units = sequence.len(),
        program = %config.runner.program,
        "hunting"
    );

    let printer = ProgressPrinter::new(!global.quiet && !output.is_json());
    let mut oracle = ProcessOracle::new(config.runner);
    match hunt(&sequence, assertion.as_ref(), &mut oracle, |p| printer.show(p)) {
        Ok(report) => {
            render_report(&report, file, output)?;
            Ok(match report.outcome {
                HuntOutcome::Found { .. } => ExitCode::SUCCESS,
                HuntOutcome::Inconclusive => ExitCode::from(EXIT_INCONCLUSIVE),
            })
        }
        Err(err) => fatal(output, &CliError::from(&err)),
    }
}

/// Execute `culprit hunt`.
///
/// # Errors
///
/// Returns an error if rendering output fails.
pub fn run_hunt(
    args: &HuntArgs,
    global: &GlobalOpts,
    output: OutputMode,
    project_root: &Path,
) -> Result<ExitCode> {
    let config = match load_config(global, &args.search, project_root) {
        Ok(config) => config,
        Err(err) => {
            return fatal(
                output,
                &CliError::coded(ErrorCode::ConfigParseError, format!("{err:#}")),
            );
        }
    };
    run_search(&args.file, config, &args.search, global, output)
}

/// Without `startup.file` or a home directory there is nothing to read.
fn startup_target(resolved: Option<PathBuf>) -> Result<PathBuf, CliError> {
    resolved.ok_or_else(|| {
        CliError::coded(
            ErrorCode::InputReadFailed,
            "no startup file configured and no home directory found; set startup.file",
        )
    })
}

/// Execute `culprit startup`: bisect the configured startup file.
///
/// # Errors
///
/// Returns an error if rendering output fails.
pub fn run_startup(
    args: &StartupArgs,
    global: &GlobalOpts,
    output: OutputMode,
    project_root: &Path,
) -> Result<ExitCode> {
    let config = match load_config(global, &args.search, project_root) {
        Ok(config) => config,
        Err(err) => {
            return fatal(
                output,
                &CliError::coded(ErrorCode::ConfigParseError, format!("{err:#}")),
            );
        }
    };
    let file = match startup_target(config.startup.resolve_file()) {
        Ok(file) => file,
        Err(err) => return fatal(output, &err),
    };
    run_search(&file, config, &args.search, global, output)
}
