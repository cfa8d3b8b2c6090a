//! culprit-sim library.
//!
//! Deterministic simulation campaigns for the bisector. Each seed derives a
//! [`Scenario`] (sequence length, causal unit, signal mode, optional
//! infrastructure failure, optional masking unit), runs a full search against
//! an in-memory oracle, and checks the result with [`HuntChecker`].
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

#![forbid(unsafe_code)]

pub mod campaign;
pub mod checker;
pub mod rng;
pub mod scenario;

pub use campaign::{
    CampaignConfig, CampaignReport, DetailedTrace, SeedFailure, replay_seed, run_campaign,
};
pub use checker::{HuntChecker, InvariantViolation, Verdict};
pub use rng::DeterministicRng;
pub use scenario::{Masking, Scenario, SignalMode};
