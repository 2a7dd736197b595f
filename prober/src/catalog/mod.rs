//! The probe catalog.
//!
//! A fixed, ordered list of named probes, each tagged with a severity tier
//! and a pure description of what success means, expressed as one
//! [`Operation`] the executor can simulate and commit. Tier thresholds live
//! in `chainprobe_common::config` so the aggregation policy is testable
//! independently of the probes themselves.

mod probes;

use anyhow::Result;
use futures::future::BoxFuture;
use primitive_types::U256;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::Display;

use chainprobe_common::config::RESERVED_SLOT_CEILING;
use chainprobe_common::types::{Address, AssetId};
use chainprobe_common::{Operation, TargetEnvironment};

/// Severity tier governing aggregation weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    /// Feature the protocol cannot run without
    Critical,
    /// Feature the protocol degrades without
    Important,
    /// Informational only; never affects the verdict
    Performance,
}

/// Post-commit verification hook reading environment state through the
/// public interface (raw slot reads), so the executor stays generic over
/// remote and in-process environments.
pub type PostCheck =
    for<'a> fn(&'a dyn TargetEnvironment, &'a ProbeFixture) -> BoxFuture<'a, Result<()>>;

/// A single named check of one environment feature.
///
/// Immutable; defined once at catalog-construction time. `build` produces
/// the probe's operation from a fresh fixture, `post_check` optionally
/// verifies the success criterion after the receipt lands.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// Stable identifier, also the key in the assessment report
    pub name: &'static str,
    /// Severity tier
    pub tier: Tier,
    /// Operation builder invoked once per run
    pub build: fn(&ProbeFixture) -> Operation,
    /// Optional post-commit verification
    pub post_check: Option<PostCheck>,
}

/// Per-run random identifiers.
///
/// Every probe invocation gets fresh addresses, asset ids and scratch
/// slots, so repeated catalog runs against the same environment are
/// side-effect-isolated and yield the same verdict.
#[derive(Debug, Clone)]
pub struct ProbeFixture {
    /// Primary account the probe mints to
    pub holder: Address,
    /// Account acting as spender/recipient
    pub operator: Address,
    /// Primary asset id
    pub asset: AssetId,
    /// Second asset id (pool pairing), distinct from `asset`
    pub counter_asset: AssetId,
    /// First scratch storage slot, above the reserved range
    pub slot_base: U256,
}

impl ProbeFixture {
    /// Generate fresh identifiers for one probe run.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();

        let asset = AssetId::from(rng.gen::<u64>());
        let mut counter_asset = AssetId::from(rng.gen::<u64>());
        if counter_asset == asset {
            counter_asset = counter_asset + U256::one();
        }

        Self {
            holder: random_address(&mut rng),
            operator: random_address(&mut rng),
            asset,
            counter_asset,
            slot_base: U256::from(rng.gen::<u32>() as u64 + RESERVED_SLOT_CEILING),
        }
    }
}

fn random_address(rng: &mut impl Rng) -> Address {
    let mut bytes = [0u8; 20];
    rng.fill(&mut bytes[..]);
    Address::from(bytes)
}

/// The fixed probe catalog, in execution order: critical tier first, then
/// important, then performance.
pub fn catalog() -> Vec<Probe> {
    vec![
        Probe {
            name: "unlock-callback",
            tier: Tier::Critical,
            build: probes::unlock_callback,
            post_check: Some(probes::check_guard_idle),
        },
        Probe {
            name: "reentrancy-guard",
            tier: Tier::Critical,
            build: probes::reentrancy_guard,
            post_check: Some(probes::check_guard_idle),
        },
        Probe {
            name: "lock-exclusion",
            tier: Tier::Critical,
            build: probes::lock_exclusion,
            post_check: Some(probes::check_guard_idle),
        },
        Probe {
            name: "asset-ledger",
            tier: Tier::Critical,
            build: probes::asset_ledger,
            post_check: None,
        },
        Probe {
            name: "pool-registry",
            tier: Tier::Important,
            build: probes::pool_registry,
            post_check: None,
        },
        Probe {
            name: "batch-settlement",
            tier: Tier::Important,
            build: probes::batch_settlement,
            post_check: None,
        },
        Probe {
            name: "storage-optimization",
            tier: Tier::Performance,
            build: probes::storage_optimization,
            post_check: Some(probes::check_storage_pattern),
        },
        Probe {
            name: "cost-estimation",
            tier: Tier::Performance,
            build: probes::cost_estimation,
            post_check: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainprobe_common::config::{
        CALLBACK_ACTION_BUDGET, CRITICAL_PASS_THRESHOLD, CRITICAL_PROBE_COUNT,
    };
    use std::collections::HashSet;

    #[test]
    fn test_catalog_tier_counts_match_policy() {
        let probes = catalog();
        let critical = probes.iter().filter(|p| p.tier == Tier::Critical).count();

        assert_eq!(critical, CRITICAL_PROBE_COUNT);
        assert!(CRITICAL_PASS_THRESHOLD <= CRITICAL_PROBE_COUNT);
        assert!(probes.iter().any(|p| p.tier == Tier::Important));
    }

    #[test]
    fn test_catalog_names_unique_and_ordered() {
        let probes = catalog();
        let names: HashSet<&str> = probes.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), probes.len());

        // Critical probes come first, in a fixed order
        assert_eq!(probes[0].name, "unlock-callback");
        let first_non_critical = probes
            .iter()
            .position(|p| p.tier != Tier::Critical)
            .unwrap();
        assert!(probes[first_non_critical..]
            .iter()
            .all(|p| p.tier != Tier::Critical));
    }

    #[test]
    fn test_fixture_identifiers_fresh_and_disjoint() {
        let a = ProbeFixture::generate();
        let b = ProbeFixture::generate();

        assert_ne!(a.asset, a.counter_asset);
        assert_ne!(a.holder, b.holder);
        assert!(a.slot_base >= U256::from(RESERVED_SLOT_CEILING));
    }

    fn walk(op: &Operation, f: &mut impl FnMut(&Operation)) {
        f(op);
        match op {
            Operation::Unlock { actions }
            | Operation::Guarded { actions }
            | Operation::Batch { ops: actions } => {
                for a in actions {
                    walk(a, f);
                }
            }
            Operation::ExpectGuardViolation { inner } | Operation::ExpectLedgerFault { inner } => {
                walk(inner, f)
            }
            _ => {}
        }
    }

    #[test]
    fn test_unlock_callbacks_stay_within_action_budget() {
        let fixture = ProbeFixture::generate();
        for probe in catalog() {
            let op = (probe.build)(&fixture);
            walk(&op, &mut |op| {
                if let Operation::Unlock { actions } = op {
                    assert!(
                        actions.len() <= CALLBACK_ACTION_BUDGET,
                        "probe {} exceeds the callback action budget",
                        probe.name
                    );
                }
            });
        }
    }
}
