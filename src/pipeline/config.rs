use std::time::Duration;

use super::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    /// Whole-run deadline; tasks still running when it fires are cancelled
    pub run_timeout: Option<Duration>,
    pub max_repositories: usize,
    pub channel_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            run_timeout: Some(Duration::from_secs(900)),
            max_repositories: 3,
            channel_concurrency: 2,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_max_repositories(mut self, max_repositories: usize) -> Self {
        self.max_repositories = max_repositories.max(1);
        self
    }

    pub fn with_channel_concurrency(mut self, concurrency: usize) -> Self {
        self.channel_concurrency = concurrency.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.run_timeout, Some(Duration::from_secs(900)));
        assert_eq!(config.max_repositories, 3);
        assert_eq!(config.channel_concurrency, 2);
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_retry(RetryPolicy::no_retry())
            .with_run_timeout(None)
            .with_max_repositories(5)
            .with_channel_concurrency(0);

        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.run_timeout, None);
        assert_eq!(config.max_repositories, 5);
        assert_eq!(config.channel_concurrency, 1);
    }
}
