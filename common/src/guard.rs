//! Guarded callback execution context.
//!
//! Models the lock/unlock execution context of the target environment with
//! nested-call rejection. The context is an explicit struct owned by the
//! environment that executes probe operations, not ambient global state, so
//! the transition rules are testable in isolation.
//!
//! Two independent mechanisms live here:
//!
//! - the **unlock flag**: entering the unlocked context requires it to be
//!   idle; a nested unlock attempt fails with [`GuardError::AlreadyUnlocked`]
//!   and is never queued. Callback actions assert the flag before touching
//!   shared state.
//! - the **reentrancy depth**: a counter gating a disjoint set of protected
//!   operations. Entry requires depth zero; a violation fails with
//!   [`GuardError::ReentrancyDetected`] and leaves the depth at its pre-call
//!   value.
//!
//! Release is unconditional on both paths: callers pair `begin_unlock` /
//! `enter_guarded` with `end_unlock` / `exit_guarded` around the callback
//! body regardless of its outcome, so after any completed probe run the
//! context reads idle again.

use crate::error::GuardError;

/// Lock and reentrancy state scoped to a single committed probe execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockContext {
    unlocked: bool,
    reentrancy_depth: u32,
}

impl LockContext {
    /// Fresh context in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the unlocked execution context is held.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Current nesting depth of protected operations.
    pub fn reentrancy_depth(&self) -> u32 {
        self.reentrancy_depth
    }

    /// True when both the unlock flag and the depth are back to rest.
    /// This must hold after every completed probe run, success or failure.
    pub fn is_idle(&self) -> bool {
        !self.unlocked && self.reentrancy_depth == 0
    }

    /// Enter the unlocked execution context.
    ///
    /// # Errors
    ///
    /// [`GuardError::AlreadyUnlocked`] if the context is already held.
    pub fn begin_unlock(&mut self) -> Result<(), GuardError> {
        if self.unlocked {
            return Err(GuardError::AlreadyUnlocked);
        }
        self.unlocked = true;
        Ok(())
    }

    /// Leave the unlocked execution context.
    ///
    /// Callers invoke this on every exit path, including failed callbacks.
    pub fn end_unlock(&mut self) {
        self.unlocked = false;
    }

    /// Assert the unlocked context is held before touching shared state.
    ///
    /// # Errors
    ///
    /// [`GuardError::ContextNotActive`] when called outside an unlock.
    pub fn assert_active(&self) -> Result<(), GuardError> {
        if !self.unlocked {
            return Err(GuardError::ContextNotActive);
        }
        Ok(())
    }

    /// Enter a protected operation.
    ///
    /// # Errors
    ///
    /// [`GuardError::ReentrancyDetected`] if another protected operation is
    /// already in flight. The depth is not modified on the error path.
    pub fn enter_guarded(&mut self) -> Result<(), GuardError> {
        if self.reentrancy_depth > 0 {
            return Err(GuardError::ReentrancyDetected);
        }
        self.reentrancy_depth += 1;
        Ok(())
    }

    /// Leave a protected operation. Invoked on every exit path.
    pub fn exit_guarded(&mut self) {
        self.reentrancy_depth = self.reentrancy_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_roundtrip() {
        let mut ctx = LockContext::new();
        assert!(ctx.is_idle());

        ctx.begin_unlock().unwrap();
        assert!(ctx.is_unlocked());
        ctx.assert_active().unwrap();

        ctx.end_unlock();
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_nested_unlock_rejected() {
        let mut ctx = LockContext::new();
        ctx.begin_unlock().unwrap();

        assert_eq!(ctx.begin_unlock(), Err(GuardError::AlreadyUnlocked));
        // The failed attempt must not have released the held context
        assert!(ctx.is_unlocked());

        ctx.end_unlock();
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_assert_active_outside_unlock() {
        let ctx = LockContext::new();
        assert_eq!(ctx.assert_active(), Err(GuardError::ContextNotActive));
    }

    #[test]
    fn test_reentrancy_depth_restored_after_violation() {
        let mut ctx = LockContext::new();
        ctx.enter_guarded().unwrap();
        assert_eq!(ctx.reentrancy_depth(), 1);

        // Nested protected call: rejected, depth untouched
        assert_eq!(ctx.enter_guarded(), Err(GuardError::ReentrancyDetected));
        assert_eq!(ctx.reentrancy_depth(), 1);

        ctx.exit_guarded();
        assert_eq!(ctx.reentrancy_depth(), 0);
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_exit_guarded_never_underflows() {
        let mut ctx = LockContext::new();
        ctx.exit_guarded();
        assert_eq!(ctx.reentrancy_depth(), 0);
    }

    #[test]
    fn test_unlock_and_guard_are_disjoint() {
        let mut ctx = LockContext::new();
        ctx.begin_unlock().unwrap();

        // Holding the unlock context does not block protected operations
        ctx.enter_guarded().unwrap();
        ctx.exit_guarded();

        ctx.end_unlock();
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_sequential_unlocks_allowed() {
        let mut ctx = LockContext::new();
        for _ in 0..5 {
            ctx.begin_unlock().unwrap();
            ctx.end_unlock();
        }
        assert!(ctx.is_idle());
    }
}
