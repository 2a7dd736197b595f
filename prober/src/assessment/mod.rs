//! Tiered aggregation of probe results into a compatibility verdict.
//!
//! The rule: a verdict is `INCOMPATIBLE` when fewer than 3-of-4 critical
//! probes pass (deliberately tolerant of one noisy critical probe);
//! otherwise `COMPATIBLE` when at least one important probe passes, and
//! `PARTIAL` when none do. Performance probes are informational only and
//! never move the verdict. The thresholds are named constants in
//! `chainprobe_common::config` - tune them in tests, never inline.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;
use thiserror::Error;

use chainprobe_common::config::{CRITICAL_PASS_THRESHOLD, IMPORTANT_PASS_MINIMUM};
use chainprobe_common::TargetEnvironment;

use crate::catalog::{catalog, Probe, Tier};
use crate::orchestrator::{ProbeExecutor, ProbeResult};

/// Compatibility verdict for a full catalog run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Verdict {
    /// Critical threshold met and at least one important probe passed
    Compatible,
    /// Critical threshold met but no important probe passed
    Partial,
    /// Critical threshold unmet
    Incompatible,
}

/// Per-tier pass counts backing the verdict. Not part of the wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierTally {
    /// Critical probes passed / total
    pub critical_passed: usize,
    /// Total critical probes observed
    pub critical_total: usize,
    /// Important probes passed
    pub important_passed: usize,
    /// Total important probes observed
    pub important_total: usize,
    /// Performance probes passed (informational)
    pub performance_passed: usize,
    /// Total performance probes observed
    pub performance_total: usize,
}

/// The single externally-visible failure signal of a whole run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("critical probe threshold unmet: {passed} of {total} passed, need {required}")]
pub struct IncompatibleEnvironment {
    /// Critical probes that passed
    pub passed: usize,
    /// Critical probes in the catalog
    pub total: usize,
    /// The configured threshold
    pub required: usize,
}

/// Immutable result of one full catalog run.
///
/// Serializes to the flat mapping the report consumer expects: probe names
/// as top-level keys mapping to `{success, cost, detail}`, plus a
/// `verdict` field.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    /// Result per probe, in catalog order
    #[serde(flatten)]
    pub per_probe: IndexMap<String, ProbeResult>,
    /// Overall compatibility verdict
    pub verdict: Verdict,
    /// Tier tallies backing the verdict
    #[serde(skip)]
    pub tally: TierTally,
}

impl AssessmentReport {
    /// Raise if the critical threshold was unmet - the only place the
    /// engine surfaces a run as an error instead of data.
    ///
    /// # Errors
    ///
    /// [`IncompatibleEnvironment`] when the verdict is `INCOMPATIBLE`.
    pub fn require_compatible(&self) -> Result<(), IncompatibleEnvironment> {
        if self.verdict == Verdict::Incompatible {
            return Err(IncompatibleEnvironment {
                passed: self.tally.critical_passed,
                total: self.tally.critical_total,
                required: CRITICAL_PASS_THRESHOLD,
            });
        }
        Ok(())
    }
}

/// Apply the tiered threshold rule to a finished result set.
///
/// `probes` supplies the tier of each named result; results without a
/// catalog entry are kept in the report but do not influence the verdict.
pub fn aggregate(probes: &[Probe], results: IndexMap<String, ProbeResult>) -> AssessmentReport {
    let mut tally = TierTally::default();

    for probe in probes {
        let passed = results.get(probe.name).is_some_and(|r| r.success);
        match probe.tier {
            Tier::Critical => {
                tally.critical_total += 1;
                if passed {
                    tally.critical_passed += 1;
                }
            }
            Tier::Important => {
                tally.important_total += 1;
                if passed {
                    tally.important_passed += 1;
                }
            }
            Tier::Performance => {
                tally.performance_total += 1;
                if passed {
                    tally.performance_passed += 1;
                }
            }
        }
    }

    let verdict = if tally.critical_passed < CRITICAL_PASS_THRESHOLD {
        Verdict::Incompatible
    } else if tally.important_passed >= IMPORTANT_PASS_MINIMUM {
        Verdict::Compatible
    } else {
        Verdict::Partial
    };

    log::info!(
        "assessment: {verdict} (critical {}/{}, important {}/{}, performance {}/{})",
        tally.critical_passed,
        tally.critical_total,
        tally.important_passed,
        tally.important_total,
        tally.performance_passed,
        tally.performance_total
    );

    AssessmentReport {
        per_probe: results,
        verdict,
        tally,
    }
}

/// Drives the executor once per catalog entry, strictly sequentially, and
/// aggregates the results.
///
/// # Example
///
/// ```rust,ignore
/// let assessor = Assessor::new(env);
/// let report = assessor.assess().await;
/// report.require_compatible()?;
/// ```
pub struct Assessor {
    executor: ProbeExecutor,
    probes: Vec<Probe>,
}

impl Assessor {
    /// Assessor over the default catalog.
    pub fn new(env: Arc<dyn TargetEnvironment>) -> Self {
        Self {
            executor: ProbeExecutor::new(env),
            probes: catalog(),
        }
    }

    /// Assessor with a custom executor (injected clock or timeouts).
    pub fn with_executor(executor: ProbeExecutor) -> Self {
        Self {
            executor,
            probes: catalog(),
        }
    }

    /// Run the full catalog and build the report.
    ///
    /// Committed phases never overlap: probes run one at a time and the
    /// report is appended to only from this control flow.
    pub async fn assess(&self) -> AssessmentReport {
        let mut results = IndexMap::with_capacity(self.probes.len());

        for probe in &self.probes {
            log::info!("running probe {} ({})", probe.name, probe.tier);
            let result = self.executor.run(probe).await;
            if result.success {
                log::info!("probe {}: pass ({})", probe.name, result.detail);
            } else {
                log::warn!("probe {}: FAIL ({})", probe.name, result.detail);
            }
            results.insert(probe.name.to_string(), result);
        }

        aggregate(&self.probes, results)
    }
}
