use primitive_types::U256;
use thiserror::Error;

/// Expected, recoverable failures of ledger operations.
///
/// These are ordinary data for the probes: the ledger and reentrancy probes
/// assert on them rather than treating them as fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: U256, have: U256 },

    #[error("Insufficient allowance: need {need}, have {have}")]
    InsufficientAllowance { need: U256, have: U256 },

    #[error("Balance overflow")]
    Overflow,
}

/// Violations of the lock/reentrancy invariants of the guarded execution
/// context. Always surfaced with their own wording, never conflated with a
/// generic operation failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    /// Attempted to enter the unlocked context while it is already held.
    #[error("already unlocked")]
    AlreadyUnlocked,

    /// A callback action touched shared state outside an unlocked context.
    #[error("execution context not active")]
    ContextNotActive,

    /// A protected operation was invoked while another one is in flight.
    #[error("reentrancy detected")]
    ReentrancyDetected,
}

/// Failures reported by a target environment when executing an operation.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("operation reverted: {0}")]
    Reverted(String),

    #[error("cost limit exceeded: limit {limit}, needed {needed}")]
    CostLimitExceeded { limit: u64, needed: u64 },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Guard(#[from] GuardError),
}

impl EnvironmentError {
    /// True when the failure is a lock-state or reentrancy-depth violation.
    pub fn is_guard_violation(&self) -> bool {
        matches!(self, Self::Guard(_))
    }

    /// True when the failure is an expected ledger invariant violation.
    pub fn is_ledger_fault(&self) -> bool {
        matches!(self, Self::Ledger(_))
    }
}
