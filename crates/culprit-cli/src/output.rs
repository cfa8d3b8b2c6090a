//! Output modes shared by every command.
//!
//! Reports go to stdout as pretty sections (terminal), `key=value` text lines
//! (pipes) or a single JSON document. Errors and progress always go to stderr,
//! so stdout stays parseable in JSON mode.
//!
//! The mode comes from `--format`, then the hidden `--json`, then the `FORMAT`
//! environment variable, then whether stdout is a terminal.

use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use culprit_core::{ErrorCode, HuntError};
use serde::Serialize;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections for a human at a terminal.
    Pretty,
    /// One `key=value` record per line, for pipes and agents.
    Text,
    /// A single JSON document.
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Pick the mode for this process from its flags and environment.
    pub fn detect(flag: Option<Self>, json: bool) -> Self {
        let env = std::env::var("FORMAT").ok();
        Self::choose(flag, json, env.as_deref(), io::stdout().is_terminal())
    }

    fn choose(flag: Option<Self>, json: bool, env: Option<&str>, terminal: bool) -> Self {
        flag.or_else(|| json.then_some(Self::Json))
            // Unknown FORMAT values are ignored.
            .or_else(|| env.and_then(|value| Self::from_str(value.trim(), true).ok()))
            .unwrap_or(if terminal { Self::Pretty } else { Self::Text })
    }
}

/// Title underlined with a rule.
pub fn heading(w: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(w, "{title}")?;
    writeln!(w, "{}", "-".repeat(RULE_WIDTH))
}

/// `Key:` padded to a fixed column, then the value.
pub fn field(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<13}{}", format!("{key}:"), value.as_ref())
}

/// Write `value` as JSON, or hand it to the text or pretty renderer.
pub fn emit<T: Serialize>(
    out: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text(value, out)?,
        OutputMode::Pretty => pretty(value, out)?,
    }
    Ok(())
}

/// A fatal condition as shown to the user.
///
/// JSON mode wraps it as `{"error": {"code", "summary", "message", "hint"}}`.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Stable `E####` identifier, absent for unclassified failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Fixed description of the code; `message` carries the specifics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl CliError {
    pub fn coded(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.code()),
            summary: Some(code.message()),
            message: message.into(),
            hint: code.hint(),
        }
    }

    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            code: None,
            summary: None,
            message: message.into(),
            hint: None,
        }
    }

    /// Print to stderr.
    pub fn report(&self, mode: OutputMode) -> anyhow::Result<()> {
        self.write_to(&mut io::stderr().lock(), mode)
    }

    fn write_to(&self, out: &mut dyn Write, mode: OutputMode) -> anyhow::Result<()> {
        if mode.is_json() {
            serde_json::to_writer_pretty(&mut *out, &serde_json::json!({ "error": self }))?;
            writeln!(out)?;
            return Ok(());
        }
        match self.code {
            Some(code) => writeln!(out, "error[{code}]: {}", self.message)?,
            None => writeln!(out, "error: {}", self.message)?,
        }
        if let Some(hint) = self.hint {
            writeln!(out, "  hint: {hint}")?;
        }
        Ok(())
    }
}

impl From<&HuntError> for CliError {
    fn from(err: &HuntError) -> Self {
        Self::coded(err.code(), err.to_string())
    }
}
