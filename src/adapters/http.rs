use crate::utils::error::{ResolveError, Result};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Per-request timeout and bounded retry shared by the network adapters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HttpPolicy {
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retry_attempts: 1,
            retry_delay: Duration::from_millis(250),
        }
    }
}

impl HttpPolicy {
    /// Worst case wall time of one `send` call under this policy.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.retry_attempts + 1;
        self.timeout * attempts + self.retry_delay * self.retry_attempts
    }

    pub fn client(&self, user_agent: Option<&str>) -> Client {
        let mut builder = Client::builder().timeout(self.timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        builder.build().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
    }

    /// Sends the request built by `build`, retrying transient failures.
    /// 404 is handed back to the caller as a response, not an error.
    pub async fn send<F>(&self, source_name: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let error = match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || status.as_u16() == 404 {
                        return Ok(response);
                    }
                    ResolveError::HttpStatus {
                        source_name: source_name.to_string(),
                        status: status.as_u16(),
                    }
                }
                Err(e) if e.is_timeout() => ResolveError::Timeout {
                    source_name: source_name.to_string(),
                },
                Err(e) => ResolveError::ApiError(e),
            };

            if attempt >= self.retry_attempts || !error.is_transient() {
                return Err(error);
            }

            attempt += 1;
            tracing::debug!(
                "{}: attempt {} failed ({}), retrying in {:?}",
                source_name,
                attempt,
                error,
                self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}
