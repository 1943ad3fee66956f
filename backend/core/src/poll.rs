//! Fixed-interval polling with a bounded attempt budget.
//!
//! There is no backoff and no jitter: every attempt waits the same interval,
//! so the worst case is exactly `max_attempts * interval` of sleeping.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Suspends the caller for a duration. Swapped for a fake in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many times to probe and how long to wait before each probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            interval: Duration::from_secs(2),
        }
    }
}

/// Result of a polling run that did not hit a probe error.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// The probe returned a settled value on attempt `attempts`.
    Settled { value: T, attempts: u32 },
    /// The budget ran out; `last` is the final unsettled value seen.
    Exhausted { last: Option<T>, attempts: u32 },
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self { max_attempts, interval }
    }

    /// Sleep `interval`, then call `probe`, until `is_settled` accepts a value
    /// or `max_attempts` probes have been made. A probe error stops polling
    /// at once and is returned unchanged.
    pub async fn run<T, E, F, Fut, S>(
        &self,
        sleeper: &dyn Sleeper,
        mut probe: F,
        is_settled: S,
    ) -> Result<PollOutcome<T>, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        S: Fn(&T) -> bool,
    {
        let mut last = None;
        for attempt in 1..=self.max_attempts {
            sleeper.sleep(self.interval).await;
            let value = probe(attempt).await?;
            if is_settled(&value) {
                debug!(attempt, "Poll settled");
                return Ok(PollOutcome::Settled { value, attempts: attempt });
            }
            debug!(attempt, max = self.max_attempts, "Poll not settled yet");
            last = Some(value);
        }
        Ok(PollOutcome::Exhausted {
            last,
            attempts: self.max_attempts,
        })
    }
}
