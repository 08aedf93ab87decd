//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before re-try number `retry` (1-based): `base * 2^(retry-1)`,
/// capped at `max`, plus up to 10% jitter.
pub fn calculate_backoff(retry: u32, base: Duration, max: Duration) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(retry - 1));
    let capped = delay_ms.min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
