use crate::config::EngineConfig;
use crate::core::emitter::ProgressEmitter;
use crate::core::transport::ApiClient;
use crate::domain::model::RawStargazer;
use crate::domain::ports::{ApiResponse, HttpTransport};
use crate::utils::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;

/// How long to wait when a response signals an exhausted rate limit.
///
/// Only a 403 whose remaining-count header is exactly `0` qualifies. The
/// wait runs until the reset epoch, floored at zero; a missing or unreadable
/// reset header means "now".
pub fn rate_limit_wait(response: &ApiResponse, now: DateTime<Utc>) -> Option<Duration> {
    if response.status != 403 {
        return None;
    }
    if response.header("x-ratelimit-remaining").map(str::trim) != Some("0") {
        return None;
    }

    let now_ms = now.timestamp_millis();
    let reset_ms = response
        .header("x-ratelimit-reset")
        .and_then(|value| value.trim().parse::<i64>().ok())
        .map(|seconds| seconds.saturating_mul(1000))
        .unwrap_or(now_ms);

    Some(Duration::from_millis((reset_ms - now_ms).max(0) as u64))
}

fn ceil_seconds(duration: Duration) -> u128 {
    duration.as_millis().div_ceil(1000)
}

/// Walks the stargazer listing one page at a time.
pub struct Paginator<'a, T: HttpTransport> {
    client: &'a ApiClient<T>,
    config: &'a EngineConfig,
    emitter: &'a ProgressEmitter,
}

impl<'a, T: HttpTransport> Paginator<'a, T> {
    pub fn new(client: &'a ApiClient<T>, config: &'a EngineConfig, emitter: &'a ProgressEmitter) -> Self {
        Self {
            client,
            config,
            emitter,
        }
    }

    /// Collects at most `cap` distinct stargazers.
    ///
    /// Stops on the cap, on an empty page, or on an unrecoverable error:
    /// `RepositoryNotFound` on 404, `ConsecutiveErrorsExceeded` once the
    /// error budget is spent, `Aborted` on cancellation. Rate-limit waits do
    /// not count as errors and retry the same page.
    pub async fn collect_stargazers(&self, owner: &str, repo: &str, cap: usize) -> Result<Vec<RawStargazer>> {
        let settings = &self.config.pagination;
        let cancel = self.client.cancel_token();
        let backoff = settings.backoff();

        let mut stargazers: Vec<RawStargazer> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut page: u32 = 1;
        let mut consecutive_errors: u32 = 0;

        tracing::info!("🔎 Listing stargazers of {}/{} (cap {})", owner, repo, cap);

        while stargazers.len() < cap {
            let url = self.client.url(&format!(
                "/repos/{}/{}/stargazers?page={}&per_page={}",
                owner, repo, page, settings.page_size
            ));

            let failure = match self
                .client
                .execute(&url, settings.timeout(), self.config.transport.max_attempts)
                .await
            {
                Err(EngineError::Aborted) => return Err(EngineError::Aborted),
                Err(error) => error,
                Ok(response) => {
                    if response.status == 404 {
                        return Err(EngineError::RepositoryNotFound {
                            owner: owner.to_string(),
                            repo: repo.to_string(),
                        });
                    }

                    if let Some(wait) = rate_limit_wait(&response, Utc::now()) {
                        self.wait_for_rate_limit(wait, cap).await?;
                        continue;
                    }

                    if !response.is_success() {
                        EngineError::HttpStatus {
                            status: response.status,
                            url: url.clone(),
                        }
                    } else {
                        match response.json::<Vec<serde_json::Value>>() {
                            Err(error) => error,
                            Ok(records) => {
                                consecutive_errors = 0;

                                if records.is_empty() {
                                    tracing::debug!("Page {} is empty; listing exhausted", page);
                                    break;
                                }

                                for record in records {
                                    if stargazers.len() >= cap {
                                        break;
                                    }
                                    let record = match serde_json::from_value::<RawStargazer>(record) {
                                        Ok(record) => record,
                                        Err(error) => {
                                            tracing::warn!(
                                                "⚠️ Skipping malformed stargazer record on page {}: {}",
                                                page,
                                                error
                                            );
                                            continue;
                                        }
                                    };
                                    if record.login.is_empty() || !seen.insert(record.login.clone()) {
                                        continue;
                                    }
                                    stargazers.push(record);
                                }

                                self.emitter
                                    .listing(
                                        format!("Fetched {} stargazers (page {})...", stargazers.len(), page),
                                        cap,
                                    )
                                    .await?;

                                page += 1;
                                if stargazers.len() >= cap {
                                    break;
                                }

                                cancel
                                    .sleep(Duration::from_millis(settings.page_delay_ms))
                                    .await?;
                                continue;
                            }
                        }
                    }
                }
            };

            consecutive_errors += 1;
            tracing::warn!(
                "⚠️ Error fetching page {} ({}/{}): {}",
                page,
                consecutive_errors,
                settings.max_consecutive_errors,
                failure
            );
            self.emitter
                .listing(
                    format!(
                        "Error fetching page {}: {}. Retrying... ({}/{})",
                        page, failure, consecutive_errors, settings.max_consecutive_errors
                    ),
                    cap,
                )
                .await?;

            if consecutive_errors >= settings.max_consecutive_errors {
                return Err(EngineError::ConsecutiveErrorsExceeded {
                    count: consecutive_errors,
                });
            }

            cancel.sleep(backoff.delay(consecutive_errors)).await?;
        }

        tracing::info!("📥 Collected {} stargazers of {}/{}", stargazers.len(), owner, repo);
        Ok(stargazers)
    }

    async fn wait_for_rate_limit(&self, wait: Duration, cap: usize) -> Result<()> {
        let settings = &self.config.pagination;
        let cancel = self.client.cancel_token();

        let limited = EngineError::RateLimited {
            wait_ms: wait.as_millis() as u64,
        };
        tracing::warn!("⏳ {} (Category: {:?})", limited, limited.category());
        self.emitter
            .listing(
                format!("Rate limit reached. Waiting {} seconds...", ceil_seconds(wait)),
                cap,
            )
            .await?;

        let tick = Duration::from_millis(settings.rate_limit_tick_ms);
        let mut remaining = wait + Duration::from_millis(settings.rate_limit_margin_ms);

        while !remaining.is_zero() {
            let step = if tick.is_zero() { remaining } else { remaining.min(tick) };
            cancel.sleep(step).await?;
            remaining -= step;

            if !remaining.is_zero() {
                self.emitter
                    .listing(
                        format!("Rate limit reached. Resuming in {} seconds...", ceil_seconds(remaining)),
                        cap,
                    )
                    .await?;
            }
        }

        tracing::info!("▶️ Rate limit window reset, resuming pagination");
        Ok(())
    }
}
