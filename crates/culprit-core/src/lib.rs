//! culprit-core library.
//!
//! Locates, within an ordered sequence of code units, the first unit that
//! makes a fault reproducible. Every test set runs in a fresh isolated
//! environment behind the [`OracleRunner`] seam.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for the search ([`HuntError`]);
//!   `anyhow::Result` for configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

#![forbid(unsafe_code)]

pub mod bisect;
pub mod config;
pub mod error;
pub mod hunt;
pub mod oracle;
pub mod progress;
pub mod runner;
pub mod split;
pub mod unit;
pub mod validate;

pub use bisect::{Bisection, BisectionResult, bisect};
pub use error::{ErrorCode, HuntError, InfrastructureError, PreconditionFailed};
pub use hunt::{HuntOutcome, HuntReport, hunt};
pub use oracle::{ErrorInfo, OracleOutcome, OracleRunner, Payload, TableOracle};
pub use progress::{Phase, Progress};
pub use runner::ProcessOracle;
pub use unit::{Assertion, Sequence, Unit};
