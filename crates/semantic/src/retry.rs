//! Retry policy for model load attempts.
//!
//! A load sequence makes `1 + max_retries` attempts with a delay between them.
//! The defaults describe the model-load policy (3 attempts, fixed 5 s spacing);
//! the exponential knobs stay available for callers that want backoff.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry (base for exponential backoff) in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Maximum delay between retries in milliseconds.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff. `1.0` keeps the spacing fixed.
    pub backoff_multiplier: f64,
    /// Add random jitter to prevent thundering herd.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        if self.max_delay < delay {
            self.max_delay = delay;
        }
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts a sequence may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculate delay for a specific retry attempt (0-indexed; attempt 0 never waits).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        // Exponential backoff: base_delay * multiplier^(attempt-1)
        let exponential =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        // Add jitter (±25%) to prevent synchronized retries
        if self.jitter {
            let jitter_range = delay_ms / 4;
            if jitter_range > 0 {
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos() as u64;
                let jitter = nanos % (jitter_range * 2);
                let delay_with_jitter = delay_ms.saturating_sub(jitter_range) + jitter;
                return Duration::from_millis(delay_with_jitter);
            }
        }

        Duration::from_millis(delay_ms)
    }
}

/// Result of a retryable operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error).
    pub result: Result<T, E>,
    /// Number of attempts made (1 = first try succeeded).
    pub attempts: u32,
    /// Total time spent, including delays.
    pub total_duration: Duration,
    /// Whether the operation ultimately succeeded.
    pub succeeded: bool,
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        self.succeeded
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Execute an async operation with retry logic.
///
/// `operation` receives the 0-based attempt number. Errors for which
/// `is_retryable` returns `false` end the sequence immediately.
///
/// # Example
/// ```
/// use semantic::retry::{RetryConfig, execute_with_retry_async};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = RetryConfig::default().with_base_delay(Duration::from_millis(1));
///
/// let result = execute_with_retry_async(
///     &config,
///     |_err: &String| true,
///     |attempt| async move {
///         if attempt == 0 {
///             Err("transient error".to_string())
///         } else {
///             Ok("success")
///         }
///     },
/// )
/// .await;
///
/// assert!(result.succeeded);
/// assert_eq!(result.attempts, 2);
/// # }
/// ```
pub async fn execute_with_retry_async<T, E, F, Fut, R>(
    config: &RetryConfig,
    is_retryable: R,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let start = Instant::now();
    let mut attempt = 0u32;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                    succeeded: true,
                };
            }
            Err(err) => {
                if attempt >= config.max_retries || !is_retryable(&err) {
                    return RetryResult {
                        result: Err(err),
                        attempts: attempt + 1,
                        total_duration: start.elapsed(),
                        succeeded: false,
                    };
                }

                attempt += 1;
                let delay = config.calculate_delay(attempt);
                if delay > Duration::from_millis(0) {
                    tracing::info!(
                        next_attempt = attempt + 1,
                        max_attempts = config.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "waiting before retry"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::default().with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn default_matches_model_load_policy() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.base_delay, Duration::from_secs(5));
        assert!(!config.jitter);
    }

    #[test]
    fn fixed_spacing_by_default() {
        let config = RetryConfig::default();
        assert_eq!(config.calculate_delay(0), Duration::from_millis(0));
        assert_eq!(config.calculate_delay(1), Duration::from_secs(5));
        assert_eq!(config.calculate_delay(2), Duration::from_secs(5));
    }

    #[test]
    fn calculate_delay_exponential() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(10))
            .with_backoff_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(config.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(config.calculate_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn calculate_delay_respects_max() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_millis(500))
            .with_backoff_multiplier(10.0);

        assert!(config.calculate_delay(1) <= Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_quarter() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_millis(400))
            .with_jitter(true);
        let delay = config.calculate_delay(1);
        assert!(delay >= Duration::from_millis(300));
        assert!(delay < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn success_first_try() {
        let result =
            execute_with_retry_async(&fast(), |_: &String| true, |_| async { Ok::<_, String>(7) })
                .await;

        assert!(result.is_success());
        assert_eq!(result.attempts, 1);
        assert_eq!(result.into_result().unwrap(), 7);
    }

    #[tokio::test]
    async fn exhaustion_makes_initial_plus_retries() {
        let calls = AtomicU32::new(0);
        let result: RetryResult<(), String> = execute_with_retry_async(
            &fast(),
            |_| true,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("persistent".to_string()) }
            },
        )
        .await;

        assert!(!result.succeeded);
        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.result.unwrap_err(), "persistent");
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: RetryResult<(), String> = execute_with_retry_async(
            &fast(),
            |err: &String| err != "fatal",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal".to_string()) }
            },
        )
        .await;

        assert_eq!(result.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempt_numbers_are_sequential() {
        let seen = std::sync::Mutex::new(Vec::new());
        let _ = execute_with_retry_async(
            &fast(),
            |_: &String| true,
            |attempt| {
                seen.lock().unwrap().push(attempt);
                async move {
                    if attempt < 2 {
                        Err("again".to_string())
                    } else {
                        Ok(())
                    }
                }
            },
        )
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn serde_uses_millis() {
        let config = RetryConfig::default();
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(json["base_delay"], 5000);
        let back: RetryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
