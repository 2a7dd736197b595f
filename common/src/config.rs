use std::time::Duration;

use primitive_types::U256;

// ===== Aggregation policy =====

// Number of critical-tier probes in the catalog
pub const CRITICAL_PROBE_COUNT: usize = 4;
// Critical successes required for a non-INCOMPATIBLE verdict.
// 3-of-4 tolerates one noisy or false-negative critical probe instead of
// letting a single flaky probe sink the whole assessment. Product policy,
// tuned in tests - do not change silently.
pub const CRITICAL_PASS_THRESHOLD: usize = 3;
// Important-tier successes required to upgrade PARTIAL to COMPATIBLE
pub const IMPORTANT_PASS_MINIMUM: usize = 1;

// ===== Two-phase execution protocol =====

// Commit cost limit = estimate * margin, guarding against estimation error
// causing an in-flight resource exhaustion failure
pub const COST_SAFETY_MARGIN: u64 = 2;

// Hard per-phase deadlines. A phase exceeding its deadline is abandoned and
// the probe converted into a failure result. Abandonment does not cancel an
// already-submitted operation - we only stop waiting for its receipt.
pub const DRY_RUN_TIMEOUT: Duration = Duration::from_secs(10);
pub const ESTIMATE_TIMEOUT: Duration = Duration::from_secs(10);
pub const COMMIT_TIMEOUT: Duration = Duration::from_secs(60);

// Soft threshold: a phase slower than this logs a warning but is not aborted
pub const SOFT_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

// ===== Guarded execution context =====

// Internal operations the unlock callback may perform while the context is
// held. Matches the probed protocol family's settle-then-sync callback shape.
pub const CALLBACK_ACTION_BUDGET: usize = 2;

// Well-known slots through which the environment exposes its guard state to
// raw slot reads. Probe fixtures must allocate their scratch slots above
// RESERVED_SLOT_CEILING to stay clear of these.
pub const LOCK_STATE_SLOT: U256 = U256([0, 0, 0, 0]);
pub const REENTRANCY_DEPTH_SLOT: U256 = U256([1, 0, 0, 0]);
pub const RESERVED_SLOT_CEILING: u64 = 0x20;
