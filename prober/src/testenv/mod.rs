//! In-process target environment for tests and demos.
//!
//! Implements the full environment interface against in-memory state
//! (ledger, lock context, slot store, pool registry) with a flat
//! per-operation cost model, so the two-phase protocol and the aggregation
//! policy can be exercised without a live RPC endpoint. Fault injection
//! knobs on the builder reproduce the failure modes the executor must
//! classify: simulation rejects, commit/dry-run divergence, broken cost
//! estimation and per-phase latency for timeout tests under paused time.
//!
//! ## Example
//!
//! ```rust,ignore
//! let env = Arc::new(
//!     TestEnvironmentBuilder::new()
//!         .with_forced_commit_revert("storage frozen")
//!         .build(),
//! );
//! let report = Assessor::new(env).assess().await;
//! assert_eq!(report.verdict, Verdict::Incompatible);
//! ```

mod builder;
mod environment;

pub use builder::{FaultPlan, TestEnvironmentBuilder};
pub use environment::{TestEnvironment, DEFAULT_COST_PER_UNIT};
