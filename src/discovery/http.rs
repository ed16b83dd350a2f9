//! Shared HTTP access for the discovery adapters.

use crate::core::config::{get_random_sleep_duration, Config};
use crate::core::error::{AppError, Result};

use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio::time::sleep;
use url::Url;

/// What a GET produced, already classified for the adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Body(String),
    /// 404 or another client error; retrying will not help.
    NotFound,
    /// The server answered 429.
    RateLimited,
    /// Transport failure or server error after every attempt.
    Failed(String),
}

/// `reqwest` client plus the retry and pacing policy from [`Config`].
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    config: Arc<Config>,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("Failed to build HTTP client: {}", e)))?;
        tracing::debug!(target: "discovery", "HTTP client initialized.");
        Ok(Self {
            client,
            config: Arc::new(config.clone()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Jittered pause between two requests to the same service.
    pub async fn pause(&self) {
        let delay = get_random_sleep_duration(&self.config);
        if !delay.is_zero() {
            tracing::trace!(target: "discovery", "Sleeping {:?} between requests", delay);
            sleep(delay).await;
        }
    }

    /// GET `url` with up to `max_fetch_attempts` attempts.
    pub async fn get(&self, url: &Url) -> FetchOutcome {
        let attempts = self.config.max_fetch_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                self.pause().await;
            }
            tracing::trace!(target: "discovery", "GET {} (attempt {}/{})", url, attempt, attempts);

            let response = match self.client.get(url.clone()).send().await {
                Ok(r) => r,
                Err(e) => {
                    if e.is_timeout() {
                        tracing::debug!(target: "discovery", "Request to {} timed out", url);
                    } else {
                        tracing::debug!(target: "discovery", "Request to {} failed: {}", url, e);
                    }
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    tracing::warn!(target: "discovery", "Rate limited by {}", url.host_str().unwrap_or("?"));
                    return FetchOutcome::RateLimited;
                }
                s if s.is_success() => {
                    return match response.text().await {
                        Ok(body) => FetchOutcome::Body(body),
                        Err(e) => {
                            tracing::debug!(target: "discovery", "Failed reading body of {}: {}", url, e);
                            FetchOutcome::Failed(e.to_string())
                        }
                    };
                }
                s if s.is_client_error() => {
                    tracing::debug!(target: "discovery", "{} answered {}", url, s);
                    return FetchOutcome::NotFound;
                }
                s => {
                    tracing::debug!(target: "discovery", "{} answered {}", url, s);
                    last_error = format!("HTTP {}", s);
                }
            }
        }

        FetchOutcome::Failed(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigBuilder;
    use httpmock::prelude::*;

    fn fetcher(attempts: u32) -> HttpFetcher {
        let config = ConfigBuilder::new()
            .skip_default_files()
            .sleep_between_requests(0.0, 0.0)
            .max_fetch_attempts(attempts)
            .build()
            .unwrap();
        HttpFetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_get_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/page");
                then.status(200).body("hello");
            })
            .await;

        let url = Url::parse(&server.url("/page")).unwrap();
        assert_eq!(fetcher(2).get(&url).await, FetchOutcome::Body("hello".into()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_classification() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/busy");
                then.status(429);
            })
            .await;

        let f = fetcher(2);
        let missing = Url::parse(&server.url("/missing")).unwrap();
        let busy = Url::parse(&server.url("/busy")).unwrap();
        assert_eq!(f.get(&missing).await, FetchOutcome::NotFound);
        assert_eq!(f.get(&busy).await, FetchOutcome::RateLimited);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/flaky");
                then.status(503);
            })
            .await;

        let url = Url::parse(&server.url("/flaky")).unwrap();
        let outcome = fetcher(3).get(&url).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        mock.assert_calls_async(3).await;
    }
}
