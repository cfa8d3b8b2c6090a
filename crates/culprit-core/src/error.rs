use std::fmt;
use std::io;
use std::time::Duration;

use crate::oracle::OracleOutcome;

/// Stable classification of every fatal condition the CLI can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InputReadFailed,
    NotReproduced,
    FaultWithoutInput,
    RunnerSpawnFailed,
    RunnerTransportFailed,
    RunnerTimeout,
    InternalUnexpected,
}

impl ErrorCode {
    /// `E####` identifier; the leading digit groups config/input (1),
    /// preconditions (2), runner (3) and internal (9) failures.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InputReadFailed => "E1002",
            Self::NotReproduced => "E2001",
            Self::FaultWithoutInput => "E2002",
            Self::RunnerSpawnFailed => "E3001",
            Self::RunnerTransportFailed => "E3002",
            Self::RunnerTimeout => "E3003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// One-line summary.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InputReadFailed => "Input file could not be read",
            Self::NotReproduced => "Problem not reproduced with the full input",
            Self::FaultWithoutInput => "Problem present even with nothing executed",
            Self::RunnerSpawnFailed => "Isolated runner failed to start",
            Self::RunnerTransportFailed => "Isolated runner transport failed",
            Self::RunnerTimeout => "Isolated runner timed out",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// What the user can change to get past this failure.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in culprit.toml and retry."),
            Self::InputReadFailed => Some("Check the file path and read permissions."),
            Self::NotReproduced => Some(
                "Check the assertion; without one, the full input must exit with an error.",
            ),
            Self::FaultWithoutInput => Some(
                "The runner or the assertion fails on its own; fix the environment first.",
            ),
            Self::RunnerSpawnFailed => {
                Some("Verify `runner.program` is installed and on PATH.")
            }
            Self::RunnerTransportFailed => Some("Check disk space and temp dir permissions."),
            Self::RunnerTimeout => Some("Raise `runner.timeout_secs` or pass --timeout."),
            Self::InternalUnexpected => Some("Run with -v and report the log if this persists."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Environment-level failure of an oracle call.
///
/// Never used for faults raised by the code under test; those are captured
/// into an [`OracleOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// The isolated process could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Preparing or collecting the transport (temp dir, script, pipes) failed.
    #[error("runner transport failed while {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    /// The isolated process did not terminate within its time budget.
    #[error("runner did not finish within {after:?}")]
    Timeout { after: Duration },

    /// A scripted failure from an in-memory runner.
    #[error("simulated infrastructure failure on call {call}")]
    Simulated { call: usize },
}

impl InfrastructureError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Spawn { .. } => ErrorCode::RunnerSpawnFailed,
            Self::Io { .. } => ErrorCode::RunnerTransportFailed,
            Self::Timeout { .. } => ErrorCode::RunnerTimeout,
            Self::Simulated { .. } => ErrorCode::InternalUnexpected,
        }
    }
}

/// One of the two bracket checks run before bisection did not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionFailed {
    /// Running every unit did not produce the fault.
    #[error("problem not reproduced with the full input")]
    NotReproduced { outcome: OracleOutcome },

    /// Running no unit at all already produced the fault.
    #[error("problem present even with nothing executed")]
    FaultWithoutInput { outcome: OracleOutcome },
}

impl PreconditionFailed {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotReproduced { .. } => ErrorCode::NotReproduced,
            Self::FaultWithoutInput { .. } => ErrorCode::FaultWithoutInput,
        }
    }

    /// The oracle outcome observed by the failing check.
    #[must_use]
    pub const fn outcome(&self) -> &OracleOutcome {
        match self {
            Self::NotReproduced { outcome } | Self::FaultWithoutInput { outcome } => outcome,
        }
    }
}

/// Fatal conditions that abort a hunt.
#[derive(Debug, thiserror::Error)]
pub enum HuntError {
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error(transparent)]
    Precondition(#[from] PreconditionFailed),
}

impl HuntError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Infrastructure(err) => err.code(),
            Self::Precondition(err) => err.code(),
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
