//! Shared HTTP client for every provider.
//!
//! One `reqwest::Client` (one connection pool) per process. Each call makes
//! at most `max_attempts` tries, backing off between them, and only for
//! failures that tend to clear up: connect errors, timeouts, 429 and 5xx.

use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::config::{RetryConfig, TimeoutConfig};
use crate::error::ProviderError;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::{is_transient_error, is_transient_status};

const USER_AGENT: &str = concat!("indicator-feed/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl HttpFetcher {
    pub fn new(timeouts: &TimeoutConfig, retries: &RetryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .build()?;

        Ok(Self {
            client,
            max_attempts: retries.max_attempts.max(1),
            base_delay: Duration::from_millis(retries.base_delay_ms),
            max_delay: Duration::from_millis(retries.max_delay_ms),
        })
    }

    /// GET `url` and return the body of the first 2xx response.
    ///
    /// Error strings never contain the URL, which may carry an API key.
    pub async fn get_text(&self, provider_id: &str, url: Url) -> Result<String, ProviderError> {
        let mut last_error =
            ProviderError::Transport(format!("no request sent to {provider_id}"));

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let delay = calculate_backoff(attempt - 1, self.base_delay, self.max_delay);
                tracing::debug!(
                    provider = provider_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying upstream request"
                );
                tokio::time::sleep(delay).await;
            }

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().await.map_err(|e| {
                            ProviderError::Transport(format!(
                                "reading body from {provider_id}: {}",
                                e.without_url()
                            ))
                        });
                    }

                    last_error = ProviderError::Transport(format!(
                        "HTTP {} from {provider_id}",
                        status.as_u16()
                    ));
                    if !is_transient_status(status) {
                        return Err(last_error);
                    }
                }
                Err(e) => {
                    let transient = is_transient_error(&e);
                    last_error =
                        ProviderError::Transport(format!("{provider_id}: {}", e.without_url()));
                    if !transient {
                        return Err(last_error);
                    }
                }
            }

            tracing::debug!(
                provider = provider_id,
                attempt,
                error = %last_error,
                "Transient upstream failure"
            );
        }

        Err(last_error)
    }
}
