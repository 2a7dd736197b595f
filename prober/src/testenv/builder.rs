//! Builder for [`TestEnvironment`] with fault injection.

use tokio::time::Duration;

use super::environment::{TestEnvironment, DEFAULT_COST_PER_UNIT};

/// Failure modes the environment injects into the two-phase protocol.
///
/// All knobs default to off; latency values are honored under tokio's
/// paused time so timeout tests never wait for real.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Delay every `simulate` call by this much
    pub simulate_latency: Option<Duration>,
    /// Delay every `estimate_cost` call by this much
    pub estimate_latency: Option<Duration>,
    /// Delay every `submit` call by this much
    pub submit_latency: Option<Duration>,
    /// Report every simulation as reverted with this reason
    pub fail_simulation: Option<String>,
    /// Report every committed execution as reverted with this reason,
    /// even when the simulation succeeded (divergence testing)
    pub revert_commits: Option<String>,
    /// Return estimates low enough that the safety margin cannot cover
    /// the real cost
    pub underestimate_cost: bool,
}

/// Builds a [`TestEnvironment`], optionally degraded.
///
/// # Example
///
/// ```rust,ignore
/// let env = TestEnvironmentBuilder::new()
///     .with_submit_latency(Duration::from_secs(120))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct TestEnvironmentBuilder {
    faults: FaultPlan,
    cost_per_unit: Option<u64>,
}

impl TestEnvironmentBuilder {
    /// Builder for a healthy environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge this many resource units per primitive operation.
    pub fn with_cost_per_unit(mut self, cost: u64) -> Self {
        self.cost_per_unit = Some(cost);
        self
    }

    /// Delay simulations (dry-run timeout testing).
    pub fn with_simulate_latency(mut self, latency: Duration) -> Self {
        self.faults.simulate_latency = Some(latency);
        self
    }

    /// Delay cost estimation.
    pub fn with_estimate_latency(mut self, latency: Duration) -> Self {
        self.faults.estimate_latency = Some(latency);
        self
    }

    /// Delay submission and receipt (commit timeout testing).
    pub fn with_submit_latency(mut self, latency: Duration) -> Self {
        self.faults.submit_latency = Some(latency);
        self
    }

    /// Make every dry-run report a revert with `reason`.
    pub fn with_forced_simulation_failure(mut self, reason: impl Into<String>) -> Self {
        self.faults.fail_simulation = Some(reason.into());
        self
    }

    /// Make every commit revert with `reason` despite clean simulations.
    pub fn with_forced_commit_revert(mut self, reason: impl Into<String>) -> Self {
        self.faults.revert_commits = Some(reason.into());
        self
    }

    /// Break the cost oracle so committed executions blow the margined
    /// limit.
    pub fn with_underestimated_costs(mut self) -> Self {
        self.faults.underestimate_cost = true;
        self
    }

    /// Build the environment.
    pub fn build(self) -> TestEnvironment {
        TestEnvironment::new(
            self.faults,
            self.cost_per_unit.unwrap_or(DEFAULT_COST_PER_UNIT),
        )
    }
}
