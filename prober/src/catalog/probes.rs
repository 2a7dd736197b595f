//! Operation builders and post-commit checks for the catalog entries.
//!
//! Each probe encodes its full success criterion into a single operation:
//! assertions execute inside the committed payload, and the probes that
//! verify rejection behavior wrap the illegal pattern in
//! `ExpectGuardViolation` / `ExpectLedgerFault` the way an attack-harness
//! contract would, so a passing receipt means the environment rejected the
//! pattern correctly.

use anyhow::{bail, Result};
use futures::future::BoxFuture;
use primitive_types::{H256, U256};

use chainprobe_common::config::{LOCK_STATE_SLOT, REENTRANCY_DEPTH_SLOT};
use chainprobe_common::types::PoolKey;
use chainprobe_common::{Operation, TargetEnvironment};

use super::ProbeFixture;

const PROBE_MINT_AMOUNT: u64 = 1_000;
const PROBE_TRANSFER_AMOUNT: u64 = 500;
const POOL_FEE: u32 = 3_000;

pub(super) const STORAGE_PROBE_SLOT_COUNT: usize = 8;

/// Unlock context with a two-action callback; each action asserts the
/// context is held before touching shared state.
pub(super) fn unlock_callback(fx: &ProbeFixture) -> Operation {
    Operation::Unlock {
        actions: vec![
            Operation::Batch {
                ops: vec![
                    Operation::AssertUnlocked,
                    Operation::Mint {
                        holder: fx.holder,
                        asset: fx.asset,
                        amount: U256::from(PROBE_MINT_AMOUNT),
                    },
                ],
            },
            Operation::Batch {
                ops: vec![
                    Operation::AssertUnlocked,
                    Operation::Approve {
                        owner: fx.holder,
                        spender: fx.operator,
                        asset: fx.asset,
                        amount: U256::from(PROBE_MINT_AMOUNT),
                    },
                ],
            },
        ],
    }
}

/// A protected operation invoked from within another protected operation
/// must be rejected with the reentrancy diagnostic.
pub(super) fn reentrancy_guard(_fx: &ProbeFixture) -> Operation {
    Operation::Guarded {
        actions: vec![Operation::ExpectGuardViolation {
            inner: Box::new(Operation::Guarded { actions: vec![] }),
        }],
    }
}

/// Entering the unlock context while it is already held must fail with the
/// lock-state diagnostic, never be queued.
pub(super) fn lock_exclusion(_fx: &ProbeFixture) -> Operation {
    Operation::Unlock {
        actions: vec![Operation::ExpectGuardViolation {
            inner: Box::new(Operation::Unlock { actions: vec![] }),
        }],
    }
}

/// mint -> approve -> transfer_from(half), then exact arithmetic readback.
pub(super) fn asset_ledger(fx: &ProbeFixture) -> Operation {
    let minted = U256::from(PROBE_MINT_AMOUNT);
    let moved = U256::from(PROBE_TRANSFER_AMOUNT);
    let remaining = minted - moved;

    Operation::Batch {
        ops: vec![
            Operation::Mint {
                holder: fx.holder,
                asset: fx.asset,
                amount: minted,
            },
            Operation::Approve {
                owner: fx.holder,
                spender: fx.operator,
                asset: fx.asset,
                amount: minted,
            },
            Operation::TransferFrom {
                spender: fx.operator,
                from: fx.holder,
                to: fx.operator,
                asset: fx.asset,
                amount: moved,
            },
            Operation::AssertBalance {
                holder: fx.holder,
                asset: fx.asset,
                expect: remaining,
            },
            Operation::AssertBalance {
                holder: fx.operator,
                asset: fx.asset,
                expect: moved,
            },
            Operation::AssertAllowance {
                owner: fx.holder,
                spender: fx.operator,
                asset: fx.asset,
                expect: remaining,
            },
        ],
    }
}

/// Pool registration persists and is observable in the same commit.
pub(super) fn pool_registry(fx: &ProbeFixture) -> Operation {
    let key = PoolKey::new(fx.asset, fx.counter_asset, POOL_FEE);
    Operation::Batch {
        ops: vec![
            Operation::RegisterPool { key },
            Operation::AssertPool { key },
        ],
    }
}

/// A failing batch must roll back wholesale: the approve inside the failed
/// inner batch may not survive it.
pub(super) fn batch_settlement(fx: &ProbeFixture) -> Operation {
    let funded = U256::from(100u64);
    let oversized = U256::from(PROBE_TRANSFER_AMOUNT);

    Operation::Batch {
        ops: vec![
            Operation::Mint {
                holder: fx.holder,
                asset: fx.asset,
                amount: funded,
            },
            Operation::ExpectLedgerFault {
                inner: Box::new(Operation::Batch {
                    ops: vec![
                        Operation::Approve {
                            owner: fx.holder,
                            spender: fx.operator,
                            asset: fx.asset,
                            amount: oversized,
                        },
                        Operation::TransferFrom {
                            spender: fx.operator,
                            from: fx.holder,
                            to: fx.operator,
                            asset: fx.asset,
                            amount: oversized,
                        },
                    ],
                }),
            },
            Operation::AssertBalance {
                holder: fx.holder,
                asset: fx.asset,
                expect: funded,
            },
            Operation::AssertAllowance {
                owner: fx.holder,
                spender: fx.operator,
                asset: fx.asset,
                expect: U256::zero(),
            },
        ],
    }
}

/// Sequential slot writes, read back raw in the post-check.
pub(super) fn storage_optimization(fx: &ProbeFixture) -> Operation {
    let ops = (0..STORAGE_PROBE_SLOT_COUNT)
        .map(|i| Operation::WriteSlot {
            slot: fx.slot_base + U256::from(i),
            value: storage_pattern(fx, i),
        })
        .collect();
    Operation::Batch { ops }
}

/// Ordinary settlement flow; passing means the committed cost stayed
/// within the safety-margined limit derived from the estimate.
pub(super) fn cost_estimation(fx: &ProbeFixture) -> Operation {
    Operation::Batch {
        ops: vec![
            Operation::Mint {
                holder: fx.holder,
                asset: fx.asset,
                amount: U256::from(PROBE_MINT_AMOUNT),
            },
            Operation::Approve {
                owner: fx.holder,
                spender: fx.operator,
                asset: fx.asset,
                amount: U256::from(PROBE_MINT_AMOUNT),
            },
            Operation::TransferFrom {
                spender: fx.operator,
                from: fx.holder,
                to: fx.operator,
                asset: fx.asset,
                amount: U256::from(PROBE_TRANSFER_AMOUNT),
            },
        ],
    }
}

/// Deterministic per-slot fill value derived from the fixture.
pub(super) fn storage_pattern(fx: &ProbeFixture, index: usize) -> H256 {
    let seed = fx.slot_base.low_u64().wrapping_add(index as u64 + 1);
    H256::from_low_u64_be(seed.wrapping_mul(0x9e37_79b9_7f4a_7c15))
}

/// After any guard probe run the lock must read idle and the depth zero
/// through raw slot reads.
pub(super) fn check_guard_idle<'a>(
    env: &'a dyn TargetEnvironment,
    _fx: &'a ProbeFixture,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let lock = env.read_slot(LOCK_STATE_SLOT).await?;
        if !lock.is_zero() {
            bail!("lock state still engaged after run: {lock:?}");
        }
        let depth = env.read_slot(REENTRANCY_DEPTH_SLOT).await?;
        if !depth.is_zero() {
            bail!("reentrancy depth not restored after run: {depth:?}");
        }
        Ok(())
    })
}

/// Every written slot must read back exactly through the bulk read path.
pub(super) fn check_storage_pattern<'a>(
    env: &'a dyn TargetEnvironment,
    fx: &'a ProbeFixture,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let values = env
            .read_slots(fx.slot_base, STORAGE_PROBE_SLOT_COUNT)
            .await?;
        if values.len() != STORAGE_PROBE_SLOT_COUNT {
            bail!(
                "bulk read returned {} slots, expected {}",
                values.len(),
                STORAGE_PROBE_SLOT_COUNT
            );
        }
        for (i, value) in values.iter().enumerate() {
            let expect = storage_pattern(fx, i);
            if *value != expect {
                bail!("slot {i} readback mismatch: expected {expect:?}, got {value:?}");
            }
        }
        Ok(())
    })
}
