//! Retry with exponential backoff for calls to the inference endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

/// Serde helper: `Duration` as integer milliseconds.
mod serde_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds on the wire.
    #[serde(with = "serde_millis")]
    pub base_delay: Duration,
    /// Ceiling on the computed delay, in milliseconds on the wire.
    #[serde(with = "serde_millis")]
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub backoff_multiplier: f64,
    /// Randomize delays to avoid synchronized retries.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
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
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry attempt `attempt` (1-indexed; 0 means no delay).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        // ±25% jitter
        if self.jitter {
            let jitter_range = delay_ms / 4;
            if jitter_range > 0 {
                let offset = fastrand::u64(0..jitter_range * 2);
                return Duration::from_millis(delay_ms.saturating_sub(jitter_range) + offset);
            }
        }

        Duration::from_millis(delay_ms)
    }
}

/// Outcome of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    /// Final result: the success value or the last error message.
    pub result: Result<T, String>,
    /// Attempts made (1 = first try succeeded).
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    pub fn into_result(self) -> Result<T, String> {
        self.result
    }
}

/// Run `operation` until it succeeds or `max_retries` is exhausted, sleeping
/// between attempts per the configured backoff.
pub async fn execute_with_retry_async<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, String>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt + 1,
                };
            }
            Err(e) => {
                // A non-retryable classification ends the loop early.
                let final_attempt =
                    attempt == config.max_retries || e.starts_with("non-retryable");
                last_error = Some(e);
                if final_attempt {
                    break;
                }
                let delay = config.calculate_delay(attempt + 1);
                if delay > Duration::ZERO {
                    sleep(delay).await;
                }
            }
        }
    }

    RetryOutcome {
        result: Err(last_error.unwrap_or_else(|| "all retries exhausted".to_string())),
        attempts: config.max_retries + 1,
    }
}

/// Classify an error message as worth retrying.
///
/// Transient transport failures and 5xx/429 statuses retry; 4xx client
/// errors do not. Unknown errors retry.
pub fn is_retryable_error(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    if error_lower.contains("timeout")
        || error_lower.contains("connection")
        || error_lower.contains("reset")
        || error_lower.contains("refused")
        || error_lower.contains("dns")
        || error_lower.contains("unreachable")
    {
        return true;
    }

    if error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("504")
        || error_lower.contains("429")
        || error_lower.contains("500")
    {
        return true;
    }

    if error_lower.contains("400")
        || error_lower.contains("401")
        || error_lower.contains("403")
        || error_lower.contains("404")
        || error_lower.contains("422")
    {
        return false;
    }

    true
}
