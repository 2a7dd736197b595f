// Clock abstraction for deterministic phase timing.
//
// The executor measures phase durations through this trait so timing
// behavior (soft warnings, instrumentation) is testable without real
// wall-clock waits.

use std::future::Future;
use std::pin::Pin;
use tokio::time::{self, Duration, Instant};

/// Time source the executor depends on.
///
/// Production code injects [`SystemClock`]; tests inject [`PausedClock`]
/// together with `#[tokio::test(start_paused = true)]` so time only moves
/// when advanced explicitly.
pub trait Clock: Send + Sync {
    /// Current instant. Simulated time under a paused runtime.
    fn now(&self) -> Instant;

    /// Sleep for `d`. Returns instantly under a paused runtime once time
    /// is advanced past the deadline.
    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Real system time (production).
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        time::Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}

/// Paused clock for deterministic tests.
///
/// Works with tokio's `time::pause()`: time advances only via
/// [`PausedClock::advance`], so timeout paths run without real delays.
pub struct PausedClock;

impl PausedClock {
    /// Creates the clock and pauses tokio time. Under
    /// `#[tokio::test(start_paused = true)]` the pause is already active
    /// and this is a no-op convenience.
    pub fn new() -> Self {
        time::pause();
        Self
    }

    /// Advance the runtime clock by `d`, waking expired sleeps.
    pub async fn advance(&self, d: Duration) {
        time::advance(d).await
    }
}

impl Clock for PausedClock {
    fn now(&self) -> Instant {
        time::Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}

impl Default for PausedClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_paused_clock_advancement() {
        let clock = Arc::new(PausedClock::new());
        let start = clock.now();

        clock.advance(Duration::from_secs(30)).await;
        assert_eq!(clock.now() - start, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_system_clock_monotonic() {
        let clock = SystemClock;
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t2 >= t1);
    }

    #[tokio::test]
    async fn test_paused_sleep_completes_on_advance() {
        let clock = Arc::new(PausedClock::new());

        let waiter = {
            let clock = clock.clone();
            tokio::spawn(async move {
                clock.sleep(Duration::from_secs(5)).await;
                42
            })
        };

        tokio::task::yield_now().await;
        clock.advance(Duration::from_secs(6)).await;
        assert_eq!(waiter.await.unwrap(), 42);
    }
}
