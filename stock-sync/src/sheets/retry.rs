//! Retry policy for spreadsheet API calls
//!
//! Rate-limit and transient server failures are retried with exponential
//! backoff. Anything else fails the call immediately.

use log::warn;
use std::future::Future;
use std::time::Duration;

/// Backoff settings for one API call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let factor = self.backoff_multiplier.powi(exponent);
        let millis = self.base_delay.as_millis() as f64 * factor;
        let delay = Duration::from_millis(millis.min(u64::MAX as f64) as u64);
        delay.min(self.max_delay)
    }
}

/// Failure of a single HTTP exchange with the spreadsheet API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Non-success status code with the response body
    Status { status: u16, body: String },
    /// Connection, timeout or decoding failure
    Transport(String),
}

impl RequestError {
    /// 429 and the usual transient 5xx codes
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            RequestError::Transport(_) => false,
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Status { status, body } => {
                write!(f, "spreadsheet API returned HTTP {}: {}", status, body)
            }
            RequestError::Transport(msg) => write!(f, "spreadsheet API request failed: {}", msg),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RequestError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => RequestError::Transport(err.to_string()),
        }
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    description: &str,
    mut operation: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    description, attempt, config.max_attempts, delay, err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
