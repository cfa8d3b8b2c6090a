use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder substituted with the sentinel line in [`RunnerConfig::marker`].
pub const MARKER_PLACEHOLDER: &str = "{marker}";

pub const PROJECT_CONFIG_FILE: &str = "culprit.toml";

/// Upper bound for `runner.timeout_secs`: one day.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Statement printing `{marker}` on its own stdout line.
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment variables passed through to the isolated process.
    #[serde(default)]
    pub env: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            extension: default_extension(),
            marker: default_marker(),
            timeout_secs: default_timeout_secs(),
            env: Vec::new(),
        }
    }
}

impl RunnerConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            bail!("runner.program must not be empty");
        }
        if self.timeout_secs == 0 {
            bail!("runner.timeout_secs must be > 0");
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            bail!("runner.timeout_secs must be at most {MAX_TIMEOUT_SECS}");
        }
        if !self.marker.contains(MARKER_PLACEHOLDER) {
            bail!("runner.marker must contain {MARKER_PLACEHOLDER}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Blank-line separated blocks of lines.
    #[default]
    Blocks,
    /// One unit per line.
    Lines,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub split: SplitMode,
    #[serde(default = "default_comment_prefix")]
    pub comment_prefix: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            split: SplitMode::default(),
            comment_prefix: default_comment_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl StartupConfig {
    /// The configured startup file, or `~/.profile`.
    #[must_use]
    pub fn resolve_file(&self) -> Option<PathBuf> {
        self.file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".profile")))
    }
}

fn default_program() -> String {
    "sh".to_string()
}

/// `-e` so the first failing command aborts the script.
fn default_args() -> Vec<String> {
    vec!["-e".to_string()]
}

fn default_extension() -> String {
    "sh".to_string()
}

fn default_marker() -> String {
    format!("printf '%s\\n' '{MARKER_PLACEHOLDER}'")
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_comment_prefix() -> String {
    "#".to_string()
}

fn load_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `culprit.toml` from `project_root`, defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<Option<Config>> {
    let path = project_root.join(PROJECT_CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    load_file(&path).map(Some)
}

/// Load `<config_dir>/culprit/config.toml`, if any.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<Option<Config>> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(None);
    };

    let path = config_dir.join("culprit/config.toml");
    if !path.exists() {
        return Ok(None);
    }
    load_file(&path).map(Some)
}

/// Resolve the effective configuration.
///
/// An explicit path wins, then the project file, then the user file, then
/// defaults. `CULPRIT_PROGRAM` and `CULPRIT_TIMEOUT` override the result.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed, or if an
/// environment override is malformed.
pub fn resolve_config(project_root: &Path, explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => load_file(path)?,
        None => match load_project_config(project_root)? {
            Some(config) => config,
            None => load_user_config()?.unwrap_or_default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Apply `CULPRIT_*` overrides using `lookup` for environment access.
///
/// # Errors
///
/// Returns an error if `CULPRIT_TIMEOUT` is not a whole number of seconds.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(program) = lookup("CULPRIT_PROGRAM").filter(|p| !p.trim().is_empty()) {
        config.runner.program = program;
    }
    if let Some(raw) = lookup("CULPRIT_TIMEOUT") {
        config.runner.timeout_secs = raw
            .trim()
            .parse()
            .with_context(|| format!("CULPRIT_TIMEOUT must be whole seconds, got {raw:?}"))?;
    }
    Ok(())
}
