//! Convenient re-exports for common usage.
//!
//! ```rust,ignore
//! use chainprobe_prober::prelude::*;
//! ```

pub use std::sync::Arc;

pub use chainprobe_common::config;
pub use chainprobe_common::{
    Address, AssetId, EnvironmentError, GuardError, LedgerError, LockContext, Operation, PoolKey,
    Receipt, SimulationOutcome, TargetEnvironment, TokenLedger,
};

pub use crate::assessment::{aggregate, AssessmentReport, Assessor, IncompatibleEnvironment, Verdict};
pub use crate::catalog::{catalog, Probe, ProbeFixture, Tier};
pub use crate::orchestrator::{
    Clock, PausedClock, PhaseTimeouts, ProbeExecutor, ProbeResult, SystemClock,
};
pub use crate::testenv::{FaultPlan, TestEnvironment, TestEnvironmentBuilder};
