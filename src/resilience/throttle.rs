//! Throttled batch execution.
//!
//! Fans a closure out over many inputs while keeping upstream pressure
//! bounded: at most `concurrency` calls in flight, and each call holds its
//! slot for an extra `delay` after finishing.

use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::ThrottleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottledBatch {
    concurrency: usize,
    delay: Duration,
}

impl ThrottledBatch {
    pub fn new(concurrency: usize, delay: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            delay,
        }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(config.concurrency, Duration::from_millis(config.delay_ms))
    }

    /// Run `f` over `items`; outputs are returned in input order.
    pub async fn run<I, T, F, Fut>(&self, items: I, f: F) -> Vec<T>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let delay = self.delay;

        let calls = items.into_iter().map(|item| {
            let slots = slots.clone();
            let call = f(item);
            async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _slot = slots.acquire_owned().await.ok();
                let output = call.await;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                output
            }
        });

        join_all(calls).await
    }
}

impl Default for ThrottledBatch {
    fn default() -> Self {
        Self::from_config(&ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_preserves_order_and_bounds_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let batch = ThrottledBatch::new(2, Duration::ZERO);

        let out = batch
            .run(1..=6u64, |n| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10 * (7 - n))).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    n * 10
                }
            })
            .await;

        assert_eq!(out, vec![10, 20, 30, 40, 50, 60]);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_sequential_delay() {
        let batch = ThrottledBatch::new(1, Duration::from_millis(30));
        let start = Instant::now();
        let out = batch.run(vec!["a", "b", "c"], |s| async move { s.len() }).await;
        assert_eq!(out, vec![1, 1, 1]);
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
