use std::time::Duration;

use secrecy::SecretString;

use crate::client::consts;

/// Bounded reconnection schedule applied after a transport drop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the given 1-based attempt: doubling from the initial
    /// delay, clamped to the cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            consts::RECONNECT_MAX_ATTEMPTS,
            consts::RECONNECT_INITIAL_DELAY,
            consts::RECONNECT_MAX_DELAY,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    auth_token: Option<SecretString>,
    capacity: usize,
    connect_timeout: Duration,
    retry: RetryPolicy,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_auth_token(mut self, token: &str) -> Self {
        self.config.auth_token = Some(SecretString::from(token.to_string()));
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: consts::DEFAULT_BASE_URL.to_string(),
            auth_token: None,
            capacity: consts::DEFAULT_CAPACITY,
            connect_timeout: consts::CONNECT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_token(&self) -> Option<&SecretString> {
        self.auth_token.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
