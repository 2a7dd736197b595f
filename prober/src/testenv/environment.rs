//! In-memory implementation of the target environment interface.

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::Mutex;
use primitive_types::{H256, U256};

use chainprobe_common::config::{
    CALLBACK_ACTION_BUDGET, COST_SAFETY_MARGIN, LOCK_STATE_SLOT, REENTRANCY_DEPTH_SLOT,
    RESERVED_SLOT_CEILING,
};
use chainprobe_common::types::{Address, AssetId, PoolKey};
use chainprobe_common::{
    EnvironmentError, LockContext, Operation, Receipt, SimulationOutcome, TargetEnvironment,
    TokenLedger,
};

use super::builder::FaultPlan;

/// Flat resource price charged per primitive operation unit.
pub const DEFAULT_COST_PER_UNIT: u64 = 5_000;

/// Whole observable state of the in-memory ledger.
///
/// Cloneable so simulation runs against a throwaway copy and committed
/// composites are atomic: the interpreter mutates a scratch clone and the
/// caller installs it only on success.
#[derive(Debug, Clone, Default)]
struct EnvState {
    ledger: TokenLedger,
    guard: LockContext,
    slots: std::collections::HashMap<U256, H256>,
    pools: IndexSet<PoolKey>,
}

/// In-process target environment.
///
/// Mirrors how the probed environment family behaves: a multi-asset
/// ledger, a guarded execution context exposed through two well-known
/// storage slots, a pool registry and raw scratch slots. Operations are
/// serialized by an internal mutex, exactly as the remote environment
/// serializes committed calls.
pub struct TestEnvironment {
    state: Mutex<EnvState>,
    faults: FaultPlan,
    cost_per_unit: u64,
}

impl TestEnvironment {
    pub(super) fn new(faults: FaultPlan, cost_per_unit: u64) -> Self {
        Self {
            state: Mutex::new(EnvState::default()),
            faults,
            cost_per_unit,
        }
    }

    // ========================================================================
    // Direct state access for assertions
    // ========================================================================

    /// Balance of `holder` in `asset`.
    pub fn balance_of(&self, holder: &Address, asset: &AssetId) -> U256 {
        self.state.lock().ledger.balance_of(holder, asset)
    }

    /// Allowance granted by `owner` to `spender` for `asset`.
    pub fn allowance(&self, owner: &Address, spender: &Address, asset: &AssetId) -> U256 {
        self.state.lock().ledger.allowance(owner, spender, asset)
    }

    /// Whether a pool is registered under `key`.
    pub fn pool_registered(&self, key: &PoolKey) -> bool {
        self.state.lock().pools.contains(key)
    }

    /// Whether the guarded context is fully at rest.
    pub fn guard_is_idle(&self) -> bool {
        self.state.lock().guard.is_idle()
    }

    /// Current reentrancy depth.
    pub fn reentrancy_depth(&self) -> u32 {
        self.state.lock().guard.reentrancy_depth()
    }

    fn total_cost(&self, op: &Operation) -> u64 {
        op.unit_count().saturating_mul(self.cost_per_unit)
    }
}

fn slot_value(state: &EnvState, slot: U256) -> H256 {
    // The guard state is mirrored into two reserved slots so external
    // tooling can observe it through plain slot reads
    if slot == LOCK_STATE_SLOT {
        H256::from_low_u64_be(state.guard.is_unlocked() as u64)
    } else if slot == REENTRANCY_DEPTH_SLOT {
        H256::from_low_u64_be(state.guard.reentrancy_depth() as u64)
    } else {
        state.slots.get(&slot).copied().unwrap_or_default()
    }
}

/// Execute `op` against `state`.
///
/// Callers are responsible for atomicity at the outermost boundary: run
/// against a scratch clone and install it on success. The `Expect*`
/// wrappers isolate their inner operation on a clone of their own, so a
/// failing inner never leaks partial writes.
fn apply_operation(state: &mut EnvState, op: &Operation) -> Result<(), EnvironmentError> {
    match op {
        Operation::Mint {
            holder,
            asset,
            amount,
        } => state.ledger.mint(*holder, *asset, *amount)?,

        Operation::Approve {
            owner,
            spender,
            asset,
            amount,
        } => state.ledger.approve(*owner, *spender, *asset, *amount),

        Operation::TransferFrom {
            spender,
            from,
            to,
            asset,
            amount,
        } => state
            .ledger
            .transfer_from(*spender, *from, *to, *asset, *amount)?,

        Operation::AssertBalance {
            holder,
            asset,
            expect,
        } => {
            let have = state.ledger.balance_of(holder, asset);
            if have != *expect {
                return Err(EnvironmentError::Reverted(format!(
                    "balance assertion failed: expected {expect}, have {have}"
                )));
            }
        }

        Operation::AssertAllowance {
            owner,
            spender,
            asset,
            expect,
        } => {
            let have = state.ledger.allowance(owner, spender, asset);
            if have != *expect {
                return Err(EnvironmentError::Reverted(format!(
                    "allowance assertion failed: expected {expect}, have {have}"
                )));
            }
        }

        Operation::Unlock { actions } => {
            if actions.len() > CALLBACK_ACTION_BUDGET {
                return Err(EnvironmentError::Reverted(format!(
                    "unlock callback exceeds the {CALLBACK_ACTION_BUDGET}-action budget"
                )));
            }
            state.guard.begin_unlock()?;
            let result = actions.iter().try_for_each(|a| apply_operation(state, a));
            // Released on every exit path, even when an action failed
            state.guard.end_unlock();
            result?
        }

        Operation::AssertUnlocked => state.guard.assert_active()?,

        Operation::Guarded { actions } => {
            state.guard.enter_guarded()?;
            let result = actions.iter().try_for_each(|a| apply_operation(state, a));
            state.guard.exit_guarded();
            result?
        }

        Operation::ExpectGuardViolation { inner } => {
            let mut scratch = state.clone();
            match apply_operation(&mut scratch, inner) {
                Err(e) if e.is_guard_violation() => {}
                Err(e) => {
                    return Err(EnvironmentError::Reverted(format!(
                        "expected a guard violation, got: {e}"
                    )))
                }
                Ok(()) => {
                    return Err(EnvironmentError::Reverted(
                        "expected a guard violation, operation succeeded".to_string(),
                    ))
                }
            }
        }

        Operation::ExpectLedgerFault { inner } => {
            let mut scratch = state.clone();
            match apply_operation(&mut scratch, inner) {
                Err(e) if e.is_ledger_fault() => {}
                Err(e) => {
                    return Err(EnvironmentError::Reverted(format!(
                        "expected a ledger fault, got: {e}"
                    )))
                }
                Ok(()) => {
                    return Err(EnvironmentError::Reverted(
                        "expected a ledger fault, operation succeeded".to_string(),
                    ))
                }
            }
        }

        Operation::RegisterPool { key } => {
            if !state.pools.insert(*key) {
                return Err(EnvironmentError::Reverted(
                    "pool already registered".to_string(),
                ));
            }
        }

        Operation::AssertPool { key } => {
            if !state.pools.contains(key) {
                return Err(EnvironmentError::Reverted("pool not registered".to_string()));
            }
        }

        Operation::WriteSlot { slot, value } => {
            if *slot < U256::from(RESERVED_SLOT_CEILING) {
                return Err(EnvironmentError::Reverted(format!(
                    "write to reserved slot {slot}"
                )));
            }
            state.slots.insert(*slot, *value);
        }

        Operation::Batch { ops } => ops.iter().try_for_each(|o| apply_operation(state, o))?,
    }
    Ok(())
}

#[async_trait]
impl TargetEnvironment for TestEnvironment {
    async fn simulate(&self, op: &Operation) -> Result<SimulationOutcome> {
        if let Some(latency) = self.faults.simulate_latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(reason) = &self.faults.fail_simulation {
            return Ok(SimulationOutcome::reverted(reason.clone()));
        }

        let mut scratch = self.state.lock().clone();
        Ok(match apply_operation(&mut scratch, op) {
            Ok(()) => SimulationOutcome::success(),
            Err(e) => SimulationOutcome::reverted(e.to_string()),
        })
    }

    async fn estimate_cost(&self, op: &Operation) -> Result<u64> {
        if let Some(latency) = self.faults.estimate_latency {
            tokio::time::sleep(latency).await;
        }

        let cost = self.total_cost(op);
        if self.faults.underestimate_cost {
            // Low enough that limit = estimate * margin still undershoots
            return Ok((cost / (COST_SAFETY_MARGIN * 2)).max(1));
        }
        Ok(cost)
    }

    async fn submit(&self, op: &Operation, cost_limit: u64) -> Result<Receipt> {
        if let Some(latency) = self.faults.submit_latency {
            tokio::time::sleep(latency).await;
        }

        let cost = self.total_cost(op);

        if let Some(reason) = &self.faults.revert_commits {
            return Ok(Receipt {
                success: false,
                cost_used: cost.min(cost_limit),
                revert_reason: Some(reason.clone()),
            });
        }

        if cost > cost_limit {
            let err = EnvironmentError::CostLimitExceeded {
                limit: cost_limit,
                needed: cost,
            };
            return Ok(Receipt {
                success: false,
                cost_used: cost_limit,
                revert_reason: Some(err.to_string()),
            });
        }

        let mut state = self.state.lock();
        let mut scratch = state.clone();
        Ok(match apply_operation(&mut scratch, op) {
            Ok(()) => {
                *state = scratch;
                Receipt {
                    success: true,
                    cost_used: cost,
                    revert_reason: None,
                }
            }
            // Scratch dropped: a failed commit leaves no observable state
            Err(e) => Receipt {
                success: false,
                cost_used: cost,
                revert_reason: Some(e.to_string()),
            },
        })
    }

    async fn read_slot(&self, slot: U256) -> Result<H256> {
        let state = self.state.lock();
        Ok(slot_value(&state, slot))
    }

    async fn read_slots(&self, start: U256, count: usize) -> Result<Vec<H256>> {
        let state = self.state.lock();
        Ok((0..count)
            .map(|i| slot_value(&state, start.overflowing_add(U256::from(i)).0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testenv::TestEnvironmentBuilder;

    fn addr(id: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0] = id;
        Address::from(bytes)
    }

    fn mint(holder: Address, asset: AssetId, amount: u64) -> Operation {
        Operation::Mint {
            holder,
            asset,
            amount: U256::from(amount),
        }
    }

    #[tokio::test]
    async fn test_simulate_is_side_effect_free() {
        let env = TestEnvironmentBuilder::new().build();
        let user = addr(1);
        let asset = AssetId::from(9u64);

        let outcome = env.simulate(&mint(user, asset, 1000)).await.unwrap();
        assert!(outcome.ok);
        assert_eq!(env.balance_of(&user, &asset), U256::zero());
    }

    #[tokio::test]
    async fn test_commit_applies_state() {
        let env = TestEnvironmentBuilder::new().build();
        let user = addr(1);
        let asset = AssetId::from(9u64);

        let op = mint(user, asset, 1000);
        let receipt = env.submit(&op, u64::MAX).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.cost_used, DEFAULT_COST_PER_UNIT);
        assert_eq!(env.balance_of(&user, &asset), U256::from(1000u64));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_partial_state() {
        let env = TestEnvironmentBuilder::new().build();
        let user = addr(1);
        let operator = addr(2);
        let asset = AssetId::from(9u64);

        // Mint applies, then the oversized transfer fails the whole batch
        let op = Operation::Batch {
            ops: vec![
                mint(user, asset, 100),
                Operation::Approve {
                    owner: user,
                    spender: operator,
                    asset,
                    amount: U256::from(500u64),
                },
                Operation::TransferFrom {
                    spender: operator,
                    from: user,
                    to: operator,
                    asset,
                    amount: U256::from(500u64),
                },
            ],
        };
        let receipt = env.submit(&op, u64::MAX).await.unwrap();
        assert!(!receipt.success);
        assert!(receipt
            .revert_reason
            .unwrap()
            .contains("Insufficient balance"));

        assert_eq!(env.balance_of(&user, &asset), U256::zero());
        assert_eq!(env.allowance(&user, &operator, &asset), U256::zero());
    }

    #[tokio::test]
    async fn test_unlock_releases_on_failing_callback() {
        let env = TestEnvironmentBuilder::new().build();
        let user = addr(1);
        let operator = addr(2);
        let asset = AssetId::from(9u64);

        let op = Operation::Unlock {
            actions: vec![Operation::TransferFrom {
                spender: operator,
                from: user,
                to: operator,
                asset,
                amount: U256::from(1u64),
            }],
        };
        let receipt = env.submit(&op, u64::MAX).await.unwrap();
        assert!(!receipt.success);
        assert!(env.guard_is_idle());

        let lock = env.read_slot(LOCK_STATE_SLOT).await.unwrap();
        assert!(lock.is_zero());
    }

    #[tokio::test]
    async fn test_callback_budget_enforced() {
        let env = TestEnvironmentBuilder::new().build();
        let op = Operation::Unlock {
            actions: vec![
                Operation::AssertUnlocked,
                Operation::AssertUnlocked,
                Operation::AssertUnlocked,
            ],
        };
        let outcome = env.simulate(&op).await.unwrap();
        assert!(!outcome.ok);
        assert!(outcome.revert_reason.unwrap().contains("action budget"));
    }

    #[tokio::test]
    async fn test_expect_guard_violation_discards_inner_state() {
        let env = TestEnvironmentBuilder::new().build();
        let user = addr(1);
        let asset = AssetId::from(9u64);

        // Inner unlock mints before the nested unlock trips the guard;
        // that mint must not survive
        let op = Operation::Unlock {
            actions: vec![Operation::ExpectGuardViolation {
                inner: Box::new(Operation::Batch {
                    ops: vec![mint(user, asset, 777), Operation::Unlock { actions: vec![] }],
                }),
            }],
        };
        let receipt = env.submit(&op, u64::MAX).await.unwrap();
        assert!(receipt.success, "{:?}", receipt.revert_reason);
        assert_eq!(env.balance_of(&user, &asset), U256::zero());
        assert!(env.guard_is_idle());
    }

    #[tokio::test]
    async fn test_cost_limit_exceeded_reports_failure() {
        let env = TestEnvironmentBuilder::new().build();
        let op = mint(addr(1), AssetId::from(1u64), 10);

        let receipt = env.submit(&op, 1).await.unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.cost_used, 1);
        assert!(receipt
            .revert_reason
            .unwrap()
            .contains("cost limit exceeded"));
        // And the mint never landed
        assert_eq!(
            env.balance_of(&addr(1), &AssetId::from(1u64)),
            U256::zero()
        );
    }

    #[tokio::test]
    async fn test_reserved_slot_writes_rejected() {
        let env = TestEnvironmentBuilder::new().build();
        let op = Operation::WriteSlot {
            slot: LOCK_STATE_SLOT,
            value: H256::from_low_u64_be(1),
        };
        let outcome = env.simulate(&op).await.unwrap();
        assert!(!outcome.ok);
        assert!(outcome.revert_reason.unwrap().contains("reserved slot"));
    }

    #[tokio::test]
    async fn test_guard_state_visible_through_slots() {
        let env = TestEnvironmentBuilder::new().build();

        let slots = env.read_slots(LOCK_STATE_SLOT, 2).await.unwrap();
        assert_eq!(slots, vec![H256::zero(), H256::zero()]);
    }
}
