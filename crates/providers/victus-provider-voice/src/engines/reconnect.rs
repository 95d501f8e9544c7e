//! Exponential reconnect backoff

use std::time::Duration;

const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Reconnect counters owned by one socket driver.
///
/// The n-th reconnect (counting from zero since the last successful open)
/// waits `min(max_delay, base_delay * 1.5^n)`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    current_delay: Duration,
}

impl ReconnectPolicy {
    /// Create a policy with no attempts made
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            base_delay,
            max_delay,
            current_delay: base_delay,
        }
    }

    /// Delay before reconnect number `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * BACKOFF_MULTIPLIER.powi(attempt as i32);
        if scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Claim the next attempt. `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        self.current_delay = delay;
        Some(delay)
    }

    /// Back to the initial state after a successful open
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current_delay = self.base_delay;
    }

    /// Attempts claimed since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay of the most recently claimed attempt
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Whether no further reconnect may be scheduled
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(5, Duration::from_millis(1000), Duration::from_millis(10_000))
    }

    #[test]
    fn test_backoff_sequence() {
        let mut policy = policy();
        let delays: Vec<u128> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| d.as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 1500, 2250, 3375, 5062]);
        assert!(policy.is_exhausted());
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = policy();
        assert_eq!(policy.delay_for(6), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(10_000));
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut policy = policy();
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.attempt(), 2);
        assert_eq!(policy.current_delay(), Duration::from_millis(1500));

        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.current_delay(), Duration::from_millis(1000));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
    }
}
