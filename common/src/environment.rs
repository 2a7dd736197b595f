//! Target environment interface.
//!
//! The prober treats the execution environment under test as an opaque,
//! RPC-accessible ledger: it submits [`Operation`]s and reads back
//! [`SimulationOutcome`]s, cost estimates, [`Receipt`]s and raw storage
//! slots. Everything here is consumed by the probe executor; concrete
//! implementations are either a remote JSON-RPC endpoint or the in-process
//! test environment shipped with the prober crate.

use anyhow::Result;
use async_trait::async_trait;
use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};

use crate::types::{Address, AssetId, PoolKey};

/// A single executable payload submitted to the target environment.
///
/// Operations are recursive: composites (`Batch`, `Unlock`, `Guarded`)
/// execute their children in order and are atomic at their outermost
/// boundary - a committed operation either applies entirely or leaves no
/// observable state behind. Probes encode their whole success criterion
/// into one operation so the executor can stay generic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Credit `amount` of `asset` to `holder`.
    Mint {
        holder: Address,
        asset: AssetId,
        amount: U256,
    },
    /// Set (not add) the allowance of `spender` over `owner`'s `asset`.
    Approve {
        owner: Address,
        spender: Address,
        asset: AssetId,
        amount: U256,
    },
    /// Move `amount` from `from` to `to` on behalf of `spender`.
    TransferFrom {
        spender: Address,
        from: Address,
        to: Address,
        asset: AssetId,
        amount: U256,
    },
    /// Revert unless `holder`'s balance of `asset` equals `expect`.
    AssertBalance {
        holder: Address,
        asset: AssetId,
        expect: U256,
    },
    /// Revert unless the allowance equals `expect`.
    AssertAllowance {
        owner: Address,
        spender: Address,
        asset: AssetId,
        expect: U256,
    },
    /// Enter the unlocked execution context and run `actions` as the
    /// synchronous callback body. The context is released on every exit
    /// path, even when an action fails.
    Unlock { actions: Vec<Operation> },
    /// Revert unless currently inside an unlocked context.
    AssertUnlocked,
    /// Run `actions` under the reentrancy gate (depth must be zero on
    /// entry; restored on every exit path).
    Guarded { actions: Vec<Operation> },
    /// Succeed if and only if `inner` fails with a guard violation; any
    /// state `inner` touched before failing is discarded. Used by the
    /// probes that verify the environment *rejects* illegal patterns.
    ExpectGuardViolation { inner: Box<Operation> },
    /// Succeed if and only if `inner` fails with a ledger invariant
    /// violation, discarding `inner`'s partial state.
    ExpectLedgerFault { inner: Box<Operation> },
    /// Register a pool under `key`. Duplicate registration reverts.
    RegisterPool { key: PoolKey },
    /// Revert unless a pool is registered under `key`.
    AssertPool { key: PoolKey },
    /// Write a raw storage slot. Reserved slots reject writes.
    WriteSlot { slot: U256, value: H256 },
    /// Execute children in order; atomic at the committed boundary.
    Batch { ops: Vec<Operation> },
}

impl Operation {
    /// Number of primitive execution units this operation spans, composites
    /// included. Cost models charge per unit.
    pub fn unit_count(&self) -> u64 {
        match self {
            Self::Unlock { actions } | Self::Guarded { actions } | Self::Batch { ops: actions } => {
                1 + actions.iter().map(Self::unit_count).sum::<u64>()
            }
            Self::ExpectGuardViolation { inner } | Self::ExpectLedgerFault { inner } => {
                1 + inner.unit_count()
            }
            _ => 1,
        }
    }
}

/// Outcome of a non-committing (read-only) execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    /// Whether the simulated execution completed without reverting
    pub ok: bool,
    /// Revert reason reported by the environment, when available
    pub revert_reason: Option<String>,
}

impl SimulationOutcome {
    /// Successful simulation.
    pub fn success() -> Self {
        Self {
            ok: true,
            revert_reason: None,
        }
    }

    /// Reverted simulation with a reason.
    pub fn reverted(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            revert_reason: Some(reason.into()),
        }
    }
}

/// Confirmation of a committed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Whether the committed execution applied its state changes
    pub success: bool,
    /// Resource units actually consumed
    pub cost_used: u64,
    /// Revert reason when `success` is false, if the environment reports one
    pub revert_reason: Option<String>,
}

/// RPC surface of the environment under test.
///
/// All calls are fallible and may take arbitrarily long; per-phase deadlines
/// are the probe executor's responsibility, not the implementation's.
#[async_trait]
pub trait TargetEnvironment: Send + Sync {
    /// Execute `op` in non-committing mode. No observable state may change.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport-level failures; an execution
    /// revert is reported in-band via [`SimulationOutcome`].
    async fn simulate(&self, op: &Operation) -> Result<SimulationOutcome>;

    /// Estimate the resource cost of committing `op`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot produce an estimate.
    async fn estimate_cost(&self, op: &Operation) -> Result<u64>;

    /// Submit `op` for committed execution with the given cost ceiling and
    /// wait for its receipt.
    ///
    /// # Errors
    ///
    /// Returns an error for transport-level failures; execution failure is
    /// reported in-band via [`Receipt`].
    async fn submit(&self, op: &Operation, cost_limit: u64) -> Result<Receipt>;

    /// Read one raw storage slot.
    async fn read_slot(&self, slot: U256) -> Result<H256>;

    /// Read `count` consecutive raw storage slots starting at `start`.
    async fn read_slots(&self, start: U256, count: usize) -> Result<Vec<H256>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_count_composites() {
        let leaf = Operation::AssertUnlocked;
        assert_eq!(leaf.unit_count(), 1);

        let op = Operation::Unlock {
            actions: vec![
                Operation::AssertUnlocked,
                Operation::Batch {
                    ops: vec![Operation::AssertUnlocked, Operation::AssertUnlocked],
                },
            ],
        };
        // unlock + assert + batch + 2 asserts
        assert_eq!(op.unit_count(), 5);

        let wrapped = Operation::ExpectGuardViolation {
            inner: Box::new(Operation::Guarded { actions: vec![] }),
        };
        assert_eq!(wrapped.unit_count(), 2);
    }
}
