//! Sliding-window failure throttle with exponential backoff.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use warden_core::AgentConfig;

/// Counts recent failures and decides when the next attempt may run.
///
/// Once `max_failures` failures sit inside `window`, each attempt must wait
/// `base_backoff * 2^(failures - max_failures)` after the latest failure,
/// capped at `max_backoff`. Rejected attempts are not failures.
#[derive(Debug, Clone)]
pub(crate) struct Throttle {
    failures: VecDeque<Instant>,
    max_failures: usize,
    window: Duration,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl Throttle {
    pub(crate) fn new(config: &AgentConfig) -> Self {
        Self {
            failures: VecDeque::new(),
            max_failures: config.max_failed_attempts.max(1) as usize,
            window: config.failure_window,
            base_backoff: config.base_backoff,
            max_backoff: config.max_backoff,
        }
    }

    /// Returns how long the caller must still wait, if at all.
    pub(crate) fn check(&mut self, now: Instant) -> Result<(), Duration> {
        self.prune(now);

        if self.failures.len() < self.max_failures {
            return Ok(());
        }

        let Some(&last) = self.failures.back() else {
            return Ok(());
        };

        let excess = (self.failures.len() - self.max_failures).min(16) as u32;
        let delay = self
            .base_backoff
            .saturating_mul(2u32.saturating_pow(excess))
            .min(self.max_backoff);

        let ready_at = last + delay;
        if now < ready_at {
            Err(ready_at - now)
        } else {
            Ok(())
        }
    }

    pub(crate) fn record_failure(&mut self, now: Instant) {
        self.prune(now);
        self.failures.push_back(now);
    }

    pub(crate) fn reset(&mut self) {
        self.failures.clear();
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.failures.front() {
            if now.duration_since(oldest) > self.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}
