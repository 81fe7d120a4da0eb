use crate::{QuizlistError, Result};
use std::future::Future;
use std::time::Duration;

/// Configuration for transient-failure retries
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

/// Whether a failure is worth retrying.
///
/// Transport failures (no status), server errors and rate limiting are
/// transient. Client errors, authorization failures and malformed
/// payloads will not improve on retry.
pub fn is_transient(error: &QuizlistError) -> bool {
    match error {
        QuizlistError::FetchFailed { status, .. } => match status {
            None => true,
            Some(code) => *code == 429 || *code >= 500,
        },
        QuizlistError::EnrichmentRequestFailed { status, .. } => {
            *status == 429 || *status >= 500
        }
        QuizlistError::Http(_) => true,
        _ => false,
    }
}

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// Permanent failures and exhausted retries return the last error as-is.
pub async fn retry_transient<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) if is_transient(&error) => {
                if retries >= config.max_retries {
                    log::warn!(
                        "Max retries ({}) exceeded for {} operation",
                        config.max_retries,
                        operation_name
                    );
                    return Err(error);
                }

                let delay_ms = std::cmp::min(
                    config.base_delay_ms * 2_u64.pow(retries),
                    config.max_delay_ms,
                );
                log::info!(
                    "{operation_name} failed transiently ({error}). Waiting {delay_ms} ms before retry {} of {}",
                    retries + 1,
                    config.max_retries
                );

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                retries += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
