//! # Chainprobe Prober
//!
//! Probe orchestration and aggregation engine for assessing whether a target
//! EVM-compatible execution environment supports the architectural features
//! a contract protocol depends on - without deploying the protocol itself.
//!
//! ## Architecture Overview
//!
//! - **Catalog**: fixed, ordered list of named probes, each tagged with a
//!   severity tier (critical / important / performance)
//! - **Executor**: runs one probe through the two-phase protocol (dry-run,
//!   then committed execution) with per-phase deadlines
//! - **Assessment**: tiered threshold aggregation into a single
//!   COMPATIBLE / PARTIAL / INCOMPATIBLE verdict
//! - **TestEnvironment**: in-process implementation of the environment
//!   interface for tests and demos
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chainprobe_prober::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let env = Arc::new(TestEnvironmentBuilder::new().build());
//!     let report = Assessor::new(env).assess().await;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     report.require_compatible()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **Failure is data**: no error escapes the executor as an exception;
//!    every probe outcome is an ordinary result value
//! 2. **Strictly sequential commits**: one probe at a time against the
//!    shared environment
//! 3. **Deterministic**: clock abstraction + paused-time tests, no real
//!    waits in the suite
//! 4. **Policy as constants**: tier thresholds live in one place and are
//!    independently testable

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Core orchestration - two-phase probe executor and clock abstraction
pub mod orchestrator;

/// Probe catalog - names, tiers, operations
pub mod catalog;

/// Tiered aggregation into an assessment report
pub mod assessment;

/// In-process target environment for tests and demos
pub mod testenv;

// Convenient re-exports for common usage
pub mod prelude;

pub use assessment::{aggregate, AssessmentReport, Assessor, Verdict};
pub use catalog::{catalog, Probe, ProbeFixture, Tier};
pub use orchestrator::{PhaseTimeouts, ProbeExecutor, ProbeResult};
pub use testenv::{TestEnvironment, TestEnvironmentBuilder};

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
