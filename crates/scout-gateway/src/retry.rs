//! Retry with exponential back-off and jitter for every outbound operation.
//!
//! HTTP fetches, MX lookups and SMTP probes all run through
//! [`retry_with_backoff`]; which errors are worth another attempt is decided
//! by [`GatewayError::is_transient`].

use std::future::Future;
use std::time::Duration;

use crate::error::GatewayError;

const MAX_DELAY_MS: u64 = 30_000;

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Retry | Sleep before the attempt   |
/// |-------|----------------------------|
/// | 1     | 500 ms × 2⁰ ± 25 % jitter  |
/// | 2     | 500 ms × 2¹ ± 25 % jitter  |
/// | 3     | 500 ms × 2² ± 25 % jitter  |
///
/// Delay is capped at 30 s. A `Retry-After` hint from a 429 response raises
/// the delay to at least that value, still under the cap.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = backoff_delay_ms(attempt, backoff_base_ms, err.retry_after_secs());
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient gateway error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

fn backoff_delay_ms(attempt: u32, backoff_base_ms: u64, retry_after_secs: Option<u64>) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    let floor = retry_after_secs.map_or(0, |secs| secs.saturating_mul(1_000));
    jittered.max(floor).min(MAX_DELAY_MS)
}
