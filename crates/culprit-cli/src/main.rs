#![forbid(unsafe_code)]

mod cmd;
mod output;
mod reader;
mod report;

use clap::{Args, CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exit code when the search ran but could not isolate a unit.
pub const EXIT_INCONCLUSIVE: u8 = 1;
/// Exit code for precondition, infrastructure, config and input failures.
pub const EXIT_FATAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "culprit",
    author,
    version,
    about = "culprit: find the code unit that triggers a problem",
    long_about = "Bisect a file of code units (lines or blank-line separated blocks) to find\n\
                  the first one that makes a problem reproducible. Every test runs in a fresh\n\
                  interpreter process inside an empty temporary directory."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Flags accepted by every command.
#[derive(Args, Debug, Default)]
pub struct GlobalOpts {
    /// Enable debug logging for culprit crates.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputMode>,

    /// Alias for `--format json`.
    #[arg(long, global = true, hide = true)]
    pub json: bool,

    /// Config file to use instead of culprit.toml and the user config.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Search",
        about = "Bisect a file to find the unit that triggers a problem",
        long_about = "Bisect FILE to find the first unit whose inclusion makes the problem\n\
                      reproducible. Without an assertion, the problem is an error exit of the\n\
                      interpreter. With one, it is a truthy value printed by the assertion.",
        after_help = "EXAMPLES:\n    # Find the block that makes the script fail\n    culprit hunt setup.sh\n\n    \
                      # Find the line after which $JAVA_HOME is set\n    culprit hunt env.sh --split lines --assert 'printf \"%s\\n\" \"$JAVA_HOME\"'\n\n    \
                      # Use bash with strict mode\n    culprit hunt build.sh --program bash --arg -eu\n\n    \
                      # Emit machine-readable output\n    culprit hunt setup.sh --format json"
    )]
    Hunt(cmd::hunt::HuntArgs),

    #[command(
        next_help_heading = "Search",
        about = "Bisect the shell startup file",
        long_about = "Bisect the configured startup file (startup.file, default ~/.profile).",
        after_help = "EXAMPLES:\n    # Which part of ~/.profile breaks login?\n    culprit startup\n\n    \
                      # Which part puts /opt/old on PATH?\n    culprit startup --prompt"
    )]
    Startup(cmd::hunt::StartupArgs),

    #[command(next_help_heading = "Development", about = "Developer tooling")]
    Dev {
        #[command(subcommand)]
        command: DevCommand,
    },

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    culprit completions bash\n\n    # Generate zsh completions\n    culprit completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

#[derive(Subcommand, Debug)]
enum DevCommand {
    /// Deterministic simulation campaigns for the bisector.
    Sim(cmd::sim::SimArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CULPRIT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "culprit=debug,info"
        } else {
            "culprit=info,warn"
        })
    });

    let format = env::var("CULPRIT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<ExitCode> {
    let project_root = env::current_dir()?;

    match &cli.command {
        Commands::Hunt(args) => cmd::hunt::run_hunt(args, &cli.global, output, &project_root),
        Commands::Startup(args) => {
            cmd::hunt::run_startup(args, &cli.global, output, &project_root)
        }
        Commands::Dev {
            command: DevCommand::Sim(args),
        } => cmd::sim::run_sim(args, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::write_completions(args, &mut command, &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let output = OutputMode::detect(cli.global.format, cli.global.json);
    debug!(?output, "resolved output mode");

    match run(&cli, output) {
        Ok(code) => code,
        Err(err) => {
            if CliError::uncoded(format!("{err:#}")).report(output).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(EXIT_FATAL)
        }
    }
}
