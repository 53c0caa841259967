use crate::config::{ApiConfig, EngineConfig};
use crate::domain::ports::{ApiRequest, ApiResponse, HttpTransport};
use crate::utils::cancel::CancelToken;
use crate::utils::error::{EngineError, Result};
use crate::utils::retry::{Backoff, RetryState};
use std::sync::Arc;
use std::time::Duration;

/// Per-run request executor.
///
/// Holds the bearer token and the run's cancellation token; both are shared
/// by the paginator, the enricher and every sub-fetch of the run. Each
/// attempt gets its own deadline. Timeouts and transport failures are
/// retried with exponential backoff, cancellation never is.
pub struct ApiClient<T: HttpTransport> {
    transport: Arc<T>,
    api: ApiConfig,
    backoff: Backoff,
    token: String,
    cancel: CancelToken,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(
        transport: Arc<T>,
        config: &EngineConfig,
        token: impl Into<String>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            transport,
            api: config.api.clone(),
            backoff: config.transport.backoff(),
            token: token.into(),
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Absolute URL for an API path such as `/users/octocat`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api.base_url.trim_end_matches('/'), path)
    }

    fn build_request(&self, url: &str) -> ApiRequest {
        let request = ApiRequest::get(url)
            .with_header("Accept", self.api.accept.as_str())
            .with_header("User-Agent", self.api.user_agent.as_str());
        if self.token.is_empty() {
            request
        } else {
            request.with_header("Authorization", format!("Bearer {}", self.token))
        }
    }

    /// Performs a GET with up to `max_attempts` attempts.
    ///
    /// Any HTTP status is returned as a response; only transport-level
    /// failures are retried. Fails with `MaxRetriesExceeded` once the budget
    /// is spent, or `Aborted` as soon as the run is cancelled.
    pub async fn execute(&self, url: &str, timeout: Duration, max_attempts: u32) -> Result<ApiResponse> {
        let mut retry = RetryState::new(max_attempts, self.backoff);

        loop {
            let attempt = tokio::time::timeout(timeout, self.transport.send(self.build_request(url)));

            let error = match self.cancel.guard(attempt).await? {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(EngineError::Aborted)) => return Err(EngineError::Aborted),
                Ok(Err(error)) => error,
                Err(_) => EngineError::Timeout {
                    url: url.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                },
            };

            match retry.fail() {
                Some(delay) => {
                    tracing::warn!(
                        "🔁 {} failed on attempt {}/{}: {}. Retrying in {}ms...",
                        url,
                        retry.attempts(),
                        retry.max_attempts(),
                        error,
                        delay.as_millis()
                    );
                    self.cancel.sleep(delay).await?;
                }
                None => {
                    tracing::warn!(
                        "❌ {} failed after {} attempts: {}",
                        url,
                        retry.attempts(),
                        error
                    );
                    return Err(EngineError::MaxRetriesExceeded {
                        attempts: retry.attempts(),
                        last_error: error.to_string(),
                    });
                }
            }
        }
    }
}
