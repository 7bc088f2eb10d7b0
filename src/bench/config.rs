//! Benchmark run configuration

use crate::proxy::resolver::DEFAULT_TIMEOUT_SECS;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of concurrent workers
const DEFAULT_WORKERS: usize = 10;

/// Default live view refresh interval in milliseconds
const DEFAULT_REFRESH_MS: u64 = 1000;

/// Default summary file rewrite interval in seconds
const DEFAULT_SUMMARY_INTERVAL_SECS: u64 = 3;

/// Configuration for a benchmark run
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of concurrent worker loops
    pub workers: usize,
    /// Timeout for each outbound request
    pub timeout: Duration,
    /// Pause between iterations of a worker; zero retries immediately
    pub retry_delay: Duration,
    /// Stop each worker after this many iterations
    pub max_iterations: Option<u64>,
    /// How often the live view re-reads the statistics
    pub refresh_interval: Duration,
    /// How often the summary file is rewritten
    pub summary_interval: Duration,
    /// Directory the summary file is created in
    pub log_dir: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_delay: Duration::ZERO,
            max_iterations: None,
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_MS),
            summary_interval: Duration::from_secs(DEFAULT_SUMMARY_INTERVAL_SECS),
            log_dir: PathBuf::from("."),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_summary_interval(mut self, interval: Duration) -> Self {
        self.summary_interval = interval;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Reject settings the run loop cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("worker count must be at least 1");
        }
        if self.timeout.is_zero() {
            bail!("request timeout must be greater than zero");
        }
        if self.refresh_interval.is_zero() || self.summary_interval.is_zero() {
            bail!("reporting intervals must be greater than zero");
        }
        if self.max_iterations == Some(0) {
            bail!("iteration limit must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BenchConfig::default();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.retry_delay, Duration::ZERO);
        assert_eq!(config.summary_interval, Duration::from_secs(3));
        assert!(config.max_iterations.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BenchConfig::new()
            .with_workers(64)
            .with_timeout(Duration::from_secs(15))
            .with_retry_delay(Duration::from_millis(250))
            .with_max_iterations(5)
            .with_log_dir("/tmp/bench");

        assert_eq!(config.workers, 64);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.max_iterations, Some(5));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/bench"));
    }

    #[test]
    fn test_config_validation() {
        assert!(BenchConfig::new().with_workers(0).validate().is_err());
        assert!(BenchConfig::new().with_timeout(Duration::ZERO).validate().is_err());
        assert!(BenchConfig::new()
            .with_summary_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(BenchConfig::new().with_max_iterations(0).validate().is_err());
    }
}
