//! Fixed-delay retry for connection attempts

use crate::options::{ConnectionOptions, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How often and how long to wait when retrying an operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts; zero or negative means a single attempt
    pub attempts: i32,
    /// Fixed wait between attempts
    pub delay: Duration,
    /// Include the error message in retry warnings
    pub verbose: bool,
    /// Name of the thing being retried, for logs
    pub label: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            verbose: false,
            label: crate::options::DEFAULT_CONNECTION_NAME.to_string(),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: i32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            ..Self::default()
        }
    }

    /// Policy described by connection options, labelled with the logical name
    pub fn from_options(options: &ConnectionOptions) -> Self {
        Self {
            attempts: options.retry_attempts,
            delay: options.retry_delay(),
            verbose: options.verbose_retry_log,
            label: options.connection_name(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Number of retries after the first attempt
    pub fn retries(&self) -> u32 {
        self.attempts.max(1) as u32 - 1
    }
}

/// Run `operation` until it succeeds, retries run out, or `should_retry` rejects the error
///
/// Each retry starts the operation from scratch after waiting the policy's
/// fixed delay. The last error is returned as is.
pub async fn retry_with_policy<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let retries = policy.retries();
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(
                        "Connection '{}' established after {} retr(y/ies)",
                        policy.label,
                        attempt
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt >= retries || !should_retry(&err) {
                    return Err(err);
                }
                attempt += 1;

                if policy.verbose {
                    tracing::warn!(
                        "Unable to connect to the database '{}'. Retrying ({}/{})... Error: {}",
                        policy.label,
                        attempt,
                        retries,
                        err
                    );
                } else {
                    tracing::warn!(
                        "Unable to connect to the database '{}'. Retrying ({}/{})...",
                        policy.label,
                        attempt,
                        retries
                    );
                }

                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
