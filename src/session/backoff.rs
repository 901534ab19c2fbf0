use std::time::Duration;

/// Exponential backoff between connect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub factor: u32,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            factor: 2,
            max: Duration::from_secs(2),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let growth = self.factor.max(1).saturating_pow(attempt);
        self.initial.saturating_mul(growth).min(self.max)
    }

    /// Endless sequence of delays.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0u32..).map(move |attempt| self.delay(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_sequence() {
        let delays: Vec<u64> = Backoff::default()
            .delays()
            .take(6)
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![200, 400, 800, 1600, 2000, 2000]);
    }

    #[test]
    fn test_factor_one_is_constant() {
        let backoff = Backoff {
            initial: Duration::from_millis(50),
            factor: 1,
            max: Duration::from_secs(1),
        };
        assert_eq!(backoff.delay(10), Duration::from_millis(50));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_millis(50));
    }

    #[test]
    fn test_other_factor() {
        let backoff = Backoff {
            initial: Duration::from_millis(100),
            factor: 3,
            max: Duration::from_secs(60),
        };
        let delays: Vec<u64> = backoff.delays().take(4).map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 300, 900, 2700]);
    }

    #[test]
    fn test_large_attempt_saturates() {
        assert_eq!(Backoff::default().delay(u32::MAX), Duration::from_secs(2));
    }
}
