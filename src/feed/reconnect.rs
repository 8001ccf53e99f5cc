use std::time::Duration;

/// How a feed subscription recovers from transport drops.
///
/// The delay is flat; there is no backoff growth. `max_attempts` bounds the
/// number of consecutive reconnect attempts after a failure, `None` retries
/// forever. A successful connection resets the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether another attempt may follow `attempts` consecutive ones.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retries_forever_every_three_seconds() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(3));
        assert!(policy.allows(u32::MAX - 1));
    }

    #[test]
    fn bounded_policy_stops_at_limit() {
        let policy = ReconnectPolicy::fixed(Duration::from_millis(10)).with_max_attempts(2);
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
        assert!(!ReconnectPolicy::default().with_max_attempts(0).allows(0));
    }
}
