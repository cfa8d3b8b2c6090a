//! Production oracle: one fresh interpreter process per call.
//!
//! Every call creates a temporary directory, writes the units (and the
//! assertion, behind a sentinel line) into a script, and runs the configured
//! interpreter on it with a cleared environment whose `HOME` and `TMPDIR`
//! point into that directory. On Unix the interpreter leads its own process
//! group, and the whole group is killed once the interpreter exits or runs out
//! of time, so processes the units put in the background die with it. The
//! directory, the processes and their pipes are released on every exit path.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::config::{MARKER_PLACEHOLDER, RunnerConfig};
use crate::error::InfrastructureError;
use crate::oracle::{OracleOutcome, OracleRunner};
use crate::unit::{Assertion, Unit};

/// Line printed right before the assertion runs; its output follows it.
pub const SENTINEL: &str = "__culprit_assertion_value__";

/// Maximum stderr bytes kept in an error payload.
pub const STDERR_TAIL_BYTES: usize = 4096;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs each test set in a new interpreter process.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    config: RunnerConfig,
    timeout: Duration,
}

impl ProcessOracle {
    #[must_use]
    pub const fn new(config: RunnerConfig) -> Self {
        let timeout = config.timeout();
        Self { config, timeout }
    }

    /// Override the per-call time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn script_name(&self) -> String {
        let ext = self.config.extension.trim_start_matches('.');
        if ext.is_empty() {
            "script".to_string()
        } else {
            format!("script.{ext}")
        }
    }

    fn write_script(
        &self,
        dir: &Path,
        units: &[Unit],
        assertion: Option<&Assertion>,
    ) -> io::Result<PathBuf> {
        let path = dir.join(self.script_name());
        let mut out = BufWriter::new(File::create(&path)?);
        for unit in units {
            unit.write_to(&mut out)?;
        }
        if let Some(assertion) = assertion {
            writeln!(out, "{}", self.config.marker.replace(MARKER_PLACEHOLDER, SENTINEL))?;
            assertion.write_to(&mut out)?;
        }
        out.flush()?;
        Ok(path)
    }

    fn command(&self, dir: &Path, script: &Path) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(script)
            .current_dir(dir)
            .env_clear()
            .env("HOME", dir)
            .env("TMPDIR", dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        for name in std::iter::once("PATH").chain(self.config.env.iter().map(String::as_str)) {
            if let Some(value) = std::env::var_os(name) {
                command.env(OsStr::new(name), value);
            }
        }
        command
    }
}

impl OracleRunner for ProcessOracle {
    fn evaluate(
        &mut self,
        units: &[Unit],
        assertion: Option<&Assertion>,
    ) -> Result<OracleOutcome, InfrastructureError> {
        let dir = tempfile::Builder::new()
            .prefix("culprit-")
            .tempdir()
            .map_err(io_error("creating the temp dir"))?;
        let script = self
            .write_script(dir.path(), units, assertion)
            .map_err(io_error("writing the script"))?;

        let child = self
            .command(dir.path(), &script)
            .spawn()
            .map_err(|source| InfrastructureError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let run = supervise(child, self.timeout)?;
        release(dir);

        let outcome = interpret(&run, assertion.is_some());
        debug!(
            units = units.len(),
            exit_code = ?run.status.code(),
            faulted = outcome.faulted(),
            "runner call finished"
        );
        Ok(outcome)
    }
}

fn io_error(action: &'static str) -> impl FnOnce(io::Error) -> InfrastructureError {
    move |source| InfrastructureError::Io { action, source }
}

fn release(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(err) = dir.close() {
        warn!(path = %path.display(), error = %err, "failed to remove runner temp dir");
    }
}

// ── Process supervision ──────────────────────────────────────────────────────

/// Kills the runner's process group and reaps the interpreter unless it was
/// already waited for.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    /// SIGKILL every process in the group the interpreter leads.
    #[cfg(unix)]
    fn kill_group(&mut self) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let Ok(pgid) = i32::try_from(self.child.id()) else {
            return;
        };
        // ESRCH means every member is already gone.
        let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
    }

    #[cfg(not(unix))]
    fn kill_group(&mut self) {
        let _ = self.child.kill();
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill_group();
            let _ = self.child.wait();
        }
    }
}

struct FinishedRun {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn spawn_reader(pipe: Option<impl Read + Send + 'static>) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        let _ = tx.send(result);
    });
    rx
}

fn supervise(mut child: Child, timeout: Duration) -> Result<FinishedRun, InfrastructureError> {
    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());
    let mut guard = ChildGuard {
        child,
        reaped: false,
    };

    // `None` when the budget is too large to represent: wait without a deadline.
    let deadline = Instant::now().checked_add(timeout);
    let status = loop {
        match guard.child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if deadline.is_some_and(|deadline| Instant::now() >= deadline) => {
                warn!(?timeout, "runner exceeded its time budget; killing its process group");
                return Err(InfrastructureError::Timeout { after: timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(InfrastructureError::Io {
                    action: "waiting for the runner",
                    source,
                });
            }
        }
    };
    guard.reaped = true;

    // Background processes left by the units hold the pipes open until killed.
    guard.kill_group();
    let stdout = collect(&stdout, deadline, timeout)?;
    let stderr = collect(&stderr, deadline, timeout)?;
    Ok(FinishedRun {
        status,
        stdout,
        stderr,
    })
}

fn collect(
    rx: &Receiver<io::Result<Vec<u8>>>,
    deadline: Option<Instant>,
    timeout: Duration,
) -> Result<Vec<u8>, InfrastructureError> {
    let received = match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(source)) => Err(InfrastructureError::Io {
            action: "reading runner output",
            source,
        }),
        Err(RecvTimeoutError::Timeout) => Err(InfrastructureError::Timeout { after: timeout }),
        Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
    }
}

// ── Result transport ─────────────────────────────────────────────────────────

fn interpret(run: &FinishedRun, has_assertion: bool) -> OracleOutcome {
    if !run.status.success() {
        let tail = stderr_tail(&run.stderr);
        let message = if tail.trim().is_empty() {
            format!("runner exited with {}", run.status)
        } else {
            tail
        };
        return OracleOutcome::error(run.status.code(), message);
    }

    if !has_assertion {
        return OracleOutcome::clean();
    }

    let stdout = String::from_utf8_lossy(&run.stdout);
    assertion_value(&stdout).map_or_else(
        || OracleOutcome::error(run.status.code(), "execution ended before the assertion ran"),
        OracleOutcome::value,
    )
}

/// Text printed after the last sentinel line, trimmed.
fn assertion_value(stdout: &str) -> Option<String> {
    let mut start = None;
    let mut offset = 0;
    for line in stdout.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == SENTINEL {
            start = Some(offset);
        }
    }
    start.map(|start| stdout[start..].trim().to_string())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim_end().to_string()
}
