//! Politique de nouvelles tentatives
//!
//! Désactivée par défaut (`max_attempts = 1`). Seules les erreurs
//! [`GatewayError::is_retryable`](crate::GatewayError::is_retryable) sont rejouées.

use std::time::Duration;

/// Délai de base par défaut entre deux tentatives, en millisecondes
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;

/// Délai maximal entre deux tentatives
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

const MAX_EXPONENT: u32 = 8;

/// Backoff exponentiel borné
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Nombre total d'essais, premier compris (minimum 1)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Un seul essai
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay: MAX_RETRY_DELAY,
        }
    }

    /// `max_attempts` essais au total, délai doublé à chaque échec
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: MAX_RETRY_DELAY,
        }
    }

    /// Vrai si un essai supplémentaire est permis après `attempt` (compté à partir de 1)
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }

    /// Attente avant l'essai suivant `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        self.base_delay
            .saturating_mul(2_u32.pow(exponent))
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.allows_retry(1));
    }

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::exponential(4, Duration::from_millis(100));
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(3));
        assert!(!policy.allows_retry(4));

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(30), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::exponential(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
    }
}
