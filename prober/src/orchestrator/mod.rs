//! Probe executor - the two-phase (simulate-then-commit) protocol.
//!
//! [`ProbeExecutor::run`] drives a single probe against the target
//! environment: dry-run first, and only if the simulation succeeds, a
//! committed execution with a safety-margined cost limit and a receipt
//! wait. Every phase runs under its own hard deadline; anything that goes
//! wrong - transport failure, revert, timeout, failed post-check - is
//! folded into a [`ProbeResult`] rather than propagated, so probe failure
//! is always representable as data flowing into the aggregator.

/// Clock abstractions for deterministic phase timing
pub mod clock;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};

use chainprobe_common::config::{
    COMMIT_TIMEOUT, COST_SAFETY_MARGIN, DRY_RUN_TIMEOUT, ESTIMATE_TIMEOUT, SOFT_WARNING_THRESHOLD,
};
use chainprobe_common::TargetEnvironment;

use crate::catalog::{Probe, ProbeFixture};

pub use clock::{Clock, PausedClock, SystemClock};

/// Outcome of one probe invocation. Produced fresh per run, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Whether the probe's success criterion held
    pub success: bool,
    /// Resource units consumed by the committed phase (0 when it never ran)
    pub cost: u64,
    /// Human-readable diagnostic
    pub detail: String,
}

impl ProbeResult {
    /// Failed result with no committed resources spent.
    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            cost: 0,
            detail: detail.into(),
        }
    }

    fn failure_with_cost(cost: u64, detail: String) -> Self {
        Self {
            success: false,
            cost,
            detail,
        }
    }
}

/// Hard per-phase deadlines for one probe run.
///
/// Defaults come from the named constants in `chainprobe_common::config`;
/// tests shrink them to keep paused-time runs tight.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimeouts {
    /// Deadline for the non-committing simulation
    pub dry_run: Duration,
    /// Deadline for cost estimation
    pub estimate: Duration,
    /// Deadline for submission plus receipt wait
    pub commit: Duration,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            dry_run: DRY_RUN_TIMEOUT,
            estimate: ESTIMATE_TIMEOUT,
            commit: COMMIT_TIMEOUT,
        }
    }
}

/// Runs probes one at a time through the two-phase protocol.
///
/// The executor holds the environment handle and a clock for phase timing.
/// Committed phases are strictly sequential: `run` is the only entry point
/// and callers invoke it once per catalog entry from a single control flow.
///
/// # Example
///
/// ```rust,ignore
/// let executor = ProbeExecutor::new(env.clone());
/// for probe in catalog() {
///     let result = executor.run(&probe).await;
///     println!("{}: {}", probe.name, result.detail);
/// }
/// ```
pub struct ProbeExecutor {
    env: Arc<dyn TargetEnvironment>,
    clock: Arc<dyn Clock>,
    timeouts: PhaseTimeouts,
}

impl ProbeExecutor {
    /// Executor with the default system clock and configured deadlines.
    pub fn new(env: Arc<dyn TargetEnvironment>) -> Self {
        Self {
            env,
            clock: Arc::new(SystemClock),
            timeouts: PhaseTimeouts::default(),
        }
    }

    /// Inject a clock (tests use [`PausedClock`]).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the per-phase deadlines.
    pub fn with_timeouts(mut self, timeouts: PhaseTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Run one probe to completion. Never returns an error: every failure
    /// mode is converted into a failed [`ProbeResult`].
    pub async fn run(&self, probe: &Probe) -> ProbeResult {
        // Fresh identifiers per run keep repeated catalog runs
        // side-effect-isolated on the shared environment
        let fixture = ProbeFixture::generate();
        let op = (probe.build)(&fixture);

        log::debug!("probe {}: dry-run starting", probe.name);

        // Phase 1: dry-run. A failure here short-circuits before any
        // committed resources are spent.
        let phase_start = self.clock.now();
        let sim = match timeout(self.timeouts.dry_run, self.env.simulate(&op)).await {
            Err(_) => {
                return ProbeResult::failure(format!(
                    "dry-run timed out after {:?}",
                    self.timeouts.dry_run
                ))
            }
            Ok(Err(e)) => return ProbeResult::failure(format!("dry-run failed: {e:#}")),
            Ok(Ok(outcome)) => outcome,
        };
        let dry_run_elapsed = self.clock.now() - phase_start;
        self.warn_if_slow(probe.name, "dry-run", dry_run_elapsed);

        if !sim.ok {
            let reason = sim.revert_reason.as_deref().unwrap_or("no reason given");
            return ProbeResult::failure(format!("simulation reverted: {reason}"));
        }

        // Phase 2: cost estimation, then commit with a safety margin so an
        // estimation error does not turn into an in-flight exhaustion
        let estimate = match timeout(self.timeouts.estimate, self.env.estimate_cost(&op)).await {
            Err(_) => {
                return ProbeResult::failure(format!(
                    "cost estimation timed out after {:?}",
                    self.timeouts.estimate
                ))
            }
            Ok(Err(e)) => return ProbeResult::failure(format!("cost estimation failed: {e:#}")),
            Ok(Ok(estimate)) => estimate,
        };
        let cost_limit = estimate.saturating_mul(COST_SAFETY_MARGIN);

        log::debug!(
            "probe {}: committing (estimate {estimate}, limit {cost_limit})",
            probe.name
        );

        let phase_start = self.clock.now();
        let receipt = match timeout(self.timeouts.commit, self.env.submit(&op, cost_limit)).await {
            // The submitted operation may still land later; we only stop
            // waiting for its receipt
            Err(_) => {
                return ProbeResult::failure(format!(
                    "commit timed out after {:?} (submitted operation may still land)",
                    self.timeouts.commit
                ))
            }
            Ok(Err(e)) => return ProbeResult::failure(format!("commit failed: {e:#}")),
            Ok(Ok(receipt)) => receipt,
        };
        let commit_elapsed = self.clock.now() - phase_start;
        self.warn_if_slow(probe.name, "commit", commit_elapsed);

        // A revert here despite a successful dry-run is diagnostic
        // information about the environment, surfaced distinctly
        if !receipt.success {
            let reason = receipt
                .revert_reason
                .as_deref()
                .unwrap_or("no reason given");
            return ProbeResult::failure_with_cost(
                receipt.cost_used,
                format!("committed execution reverted after successful simulation: {reason}"),
            );
        }

        if let Some(check) = probe.post_check {
            if let Err(e) = check(self.env.as_ref(), &fixture).await {
                return ProbeResult::failure_with_cost(
                    receipt.cost_used,
                    format!("post-commit verification failed: {e:#}"),
                );
            }
        }

        log::debug!(
            "probe {}: ok (dry-run {} ms, commit {} ms, cost {})",
            probe.name,
            dry_run_elapsed.as_millis(),
            commit_elapsed.as_millis(),
            receipt.cost_used
        );

        ProbeResult {
            success: true,
            cost: receipt.cost_used,
            detail: format!(
                "ok: cost {} (dry-run {} ms, commit {} ms)",
                receipt.cost_used,
                dry_run_elapsed.as_millis(),
                commit_elapsed.as_millis()
            ),
        }
    }

    fn warn_if_slow(&self, probe: &str, phase: &str, elapsed: Duration) {
        if elapsed > SOFT_WARNING_THRESHOLD {
            log::warn!(
                "probe {probe}: {phase} phase took {elapsed:?} (soft threshold {SOFT_WARNING_THRESHOLD:?})"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts_match_policy() {
        let timeouts = PhaseTimeouts::default();
        assert_eq!(timeouts.dry_run, Duration::from_secs(10));
        assert_eq!(timeouts.estimate, Duration::from_secs(10));
        assert_eq!(timeouts.commit, Duration::from_secs(60));
    }

    #[test]
    fn test_failure_result_spends_nothing() {
        let result = ProbeResult::failure("boom");
        assert!(!result.success);
        assert_eq!(result.cost, 0);
        assert_eq!(result.detail, "boom");
    }
}
