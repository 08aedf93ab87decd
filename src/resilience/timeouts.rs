//! Deadline enforcement for provider attempts.

use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::error::ProviderError;

/// Run `fut` under `deadline`; overrunning yields `ProviderError::Timeout`.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(deadline)),
    }
}
