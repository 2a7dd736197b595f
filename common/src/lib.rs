//! Chainprobe common library.
//!
//! Shared domain types for the compatibility prober: the target environment
//! interface (simulate / estimate / submit / raw slot reads), the multi-asset
//! ledger and guarded execution context exercised by the probes, the error
//! taxonomy, and the named policy constants that drive aggregation.

#![warn(clippy::all)]

pub mod config;
pub mod environment;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod types;

pub use environment::{Operation, Receipt, SimulationOutcome, TargetEnvironment};
pub use error::{EnvironmentError, GuardError, LedgerError};
pub use guard::LockContext;
pub use ledger::TokenLedger;
pub use types::{Address, AssetId, PoolKey};
