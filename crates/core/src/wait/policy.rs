use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MAX_CHECKS: u32 = 60;
pub const MAX_CHECKS_LIMIT: u32 = 600;
pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const MAX_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_RESULT_TIMEOUT_SECS: u64 = 120;
pub const MAX_RESULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;
pub const MAX_POLL_INTERVAL_SECS: f64 = 10.0;

/// Rejected poll parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("max_checks must be between 1 and 600, got {0}")]
    MaxChecks(u32),

    #[error("interval_sec must be between 1 and 60, got {0}")]
    Interval(u64),

    #[error("timeout_sec must be between 1 and 600, got {0}")]
    ResultTimeout(u64),

    #[error("poll_interval must be greater than 0 and at most 10, got {0}")]
    PollInterval(f64),
}

/// Budget for waiting on an instance status: a number of checks at a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    max_checks: u32,
    interval: Duration,
}

impl WaitPolicy {
    pub fn new(max_checks: u32, interval_secs: u64) -> Result<Self, PolicyError> {
        if !(1..=MAX_CHECKS_LIMIT).contains(&max_checks) {
            return Err(PolicyError::MaxChecks(max_checks));
        }
        if !(1..=MAX_INTERVAL_SECS).contains(&interval_secs) {
            return Err(PolicyError::Interval(interval_secs));
        }
        Ok(Self {
            max_checks,
            interval: Duration::from_secs(interval_secs),
        })
    }

    pub fn max_checks(&self) -> u32 {
        self.max_checks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_checks: DEFAULT_MAX_CHECKS,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

/// Budget for waiting on a job's images: a deadline and a fractional poll interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultPolicy {
    timeout: Duration,
    poll_interval: Duration,
}

impl ResultPolicy {
    pub fn new(timeout_secs: u64, poll_interval_secs: f64) -> Result<Self, PolicyError> {
        if !(1..=MAX_RESULT_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(PolicyError::ResultTimeout(timeout_secs));
        }
        // NaN fails both comparisons
        if !(poll_interval_secs > 0.0 && poll_interval_secs <= MAX_POLL_INTERVAL_SECS) {
            return Err(PolicyError::PollInterval(poll_interval_secs));
        }
        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            poll_interval: Duration::from_secs_f64(poll_interval_secs),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for ResultPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_RESULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_policy_bounds() {
        assert!(WaitPolicy::new(1, 1).is_ok());
        assert!(WaitPolicy::new(600, 60).is_ok());
        assert_eq!(WaitPolicy::new(0, 5), Err(PolicyError::MaxChecks(0)));
        assert_eq!(WaitPolicy::new(601, 5), Err(PolicyError::MaxChecks(601)));
        assert_eq!(WaitPolicy::new(10, 0), Err(PolicyError::Interval(0)));
        assert_eq!(WaitPolicy::new(10, 61), Err(PolicyError::Interval(61)));
    }

    #[test]
    fn test_wait_policy_default() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.max_checks(), 60);
        assert_eq!(policy.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_result_policy_bounds() {
        let policy = ResultPolicy::new(30, 0.25).unwrap();
        assert_eq!(policy.timeout(), Duration::from_secs(30));
        assert_eq!(policy.poll_interval(), Duration::from_millis(250));

        assert!(ResultPolicy::new(600, 10.0).is_ok());
        assert_eq!(ResultPolicy::new(0, 1.0), Err(PolicyError::ResultTimeout(0)));
        assert_eq!(ResultPolicy::new(601, 1.0), Err(PolicyError::ResultTimeout(601)));
        assert_eq!(ResultPolicy::new(10, 0.0), Err(PolicyError::PollInterval(0.0)));
        assert_eq!(ResultPolicy::new(10, -1.0), Err(PolicyError::PollInterval(-1.0)));
        assert_eq!(ResultPolicy::new(10, 10.5), Err(PolicyError::PollInterval(10.5)));
        assert!(ResultPolicy::new(10, f64::NAN).is_err());
    }

    #[test]
    fn test_error_messages_name_the_parameter() {
        assert_eq!(
            PolicyError::MaxChecks(0).to_string(),
            "max_checks must be between 1 and 600, got 0"
        );
        assert!(PolicyError::PollInterval(0.0)
            .to_string()
            .starts_with("poll_interval"));
    }
}
