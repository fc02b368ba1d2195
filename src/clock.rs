use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

/// Source of the delays between reveal steps.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock timers on the tokio runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock driven by hand: every sleep waits for one released tick,
/// whatever duration was asked for.
#[derive(Debug)]
pub struct ManualClock {
    ticks: Semaphore,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            ticks: Semaphore::new(0),
        }
    }

    /// Lets `count` pending or future sleeps return.
    pub fn release(&self, count: usize) {
        self.ticks.add_permits(count);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn sleep(&self, _duration: Duration) {
        if let Ok(permit) = self.ticks.acquire().await {
            permit.forget();
        }
    }
}

/// Never waits; used for instant exports and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateClock;

#[async_trait]
impl Clock for ImmediateClock {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_manual_clock_waits_for_release() {
        let clock = Arc::new(ManualClock::new());
        let woken = Arc::new(AtomicUsize::new(0));

        let task = {
            let clock = clock.clone();
            let woken = woken.clone();
            tokio::spawn(async move {
                for _ in 0..2 {
                    clock.sleep(Duration::from_secs(3600)).await;
                    woken.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        tokio::task::yield_now().await;
        assert_eq!(woken.load(Ordering::SeqCst), 0);

        clock.release(2);
        task.await.unwrap();
        assert_eq!(woken.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_uses_runtime_time() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_millis(80)).await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
