use crate::config::EngineConfig;
use crate::core::emitter::Aggregator;
use crate::core::stars::total_stars;
use crate::core::transport::ApiClient;
use crate::domain::model::{EnrichedUser, ItemOutcome, RawStargazer, UserProfile};
use crate::domain::ports::HttpTransport;
use crate::utils::error::{EngineError, Result};
use crate::utils::retry::RetryState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Turns raw stargazers into enriched users, one batch at a time.
///
/// Items of a batch run concurrently; batches run strictly in order. Item
/// failures shrink the result, batch failures are retried and then skipped.
/// Only cancellation ends enrichment early.
pub struct Enricher<T: HttpTransport> {
    client: Arc<ApiClient<T>>,
    config: Arc<EngineConfig>,
}

impl<T: HttpTransport + 'static> Enricher<T> {
    pub fn new(client: Arc<ApiClient<T>>, config: Arc<EngineConfig>) -> Self {
        Self { client, config }
    }

    pub async fn enrich(&self, stargazers: Vec<RawStargazer>, aggregator: &mut Aggregator) -> Result<()> {
        let settings = &self.config.enrichment;
        let cancel = self.client.cancel_token();
        let batch_size = settings.batch_size.max(1);
        let batch_count = stargazers.len().div_ceil(batch_size);

        for (index, batch) in stargazers.chunks(batch_size).enumerate() {
            let start = index * batch_size + 1;
            let end = start + batch.len() - 1;
            let mut retry = RetryState::new(settings.max_batch_attempts, settings.batch_backoff());

            loop {
                match self.run_batch(batch, start, end).await {
                    Ok(outcomes) => {
                        let users: Vec<EnrichedUser> =
                            outcomes.into_iter().filter_map(ItemOutcome::into_user).collect();
                        tracing::debug!(
                            "Batch {}-{} resolved with {} of {} users",
                            start,
                            end,
                            users.len(),
                            batch.len()
                        );
                        aggregator.record_batch(batch.len(), users).await?;
                        break;
                    }
                    Err(EngineError::Aborted) => return Err(EngineError::Aborted),
                    Err(error) => {
                        let delay = retry.fail();
                        tracing::warn!(
                            "⚠️ Batch {}-{} failed ({}/{}): {}",
                            start,
                            end,
                            retry.attempts(),
                            retry.max_attempts(),
                            error
                        );
                        aggregator
                            .progress(format!(
                                "Error processing batch {}-{}: {}. Retrying... ({}/{})",
                                start,
                                end,
                                error,
                                retry.attempts(),
                                retry.max_attempts()
                            ))
                            .await?;

                        match delay {
                            Some(delay) => cancel.sleep(delay).await?,
                            None => {
                                aggregator
                                    .skip_batch(
                                        batch.len(),
                                        format!(
                                            "Skipping batch {}-{} after {} failed attempts",
                                            start,
                                            end,
                                            retry.max_attempts()
                                        ),
                                    )
                                    .await?;
                                break;
                            }
                        }
                    }
                }
            }

            if index + 1 < batch_count {
                cancel
                    .sleep(Duration::from_millis(settings.batch_delay_ms))
                    .await?;
            }
        }

        Ok(())
    }

    /// Runs one batch to completion. Outcomes keep the input order.
    async fn run_batch(&self, batch: &[RawStargazer], start: usize, end: usize) -> Result<Vec<ItemOutcome>> {
        let mut tasks = JoinSet::new();
        for (position, raw) in batch.iter().cloned().enumerate() {
            let client = self.client.clone();
            let config = self.config.clone();
            tasks.spawn(async move { (position, enrich_item(client, config, raw).await) });
        }

        let mut outcomes: Vec<Option<ItemOutcome>> = vec![None; batch.len()];
        while let Some(joined) = tasks.join_next().await {
            let (position, outcome) = joined.map_err(|e| EngineError::BatchFailure {
                start,
                end,
                reason: e.to_string(),
            })?;
            outcomes[position] = Some(outcome);
        }

        self.client.cancel_token().check()?;
        Ok(outcomes.into_iter().flatten().collect())
    }
}

/// Fetches one user with item-level retries. Never fails the batch.
pub async fn enrich_item<T: HttpTransport>(
    client: Arc<ApiClient<T>>,
    config: Arc<EngineConfig>,
    raw: RawStargazer,
) -> ItemOutcome {
    let settings = &config.enrichment;
    let mut retry = RetryState::new(settings.item_max_attempts, settings.item_backoff());

    loop {
        match fetch_user(&client, &config, &raw).await {
            Ok(Some(user)) => return ItemOutcome::Present(Box::new(user)),
            Ok(None) => {
                tracing::debug!("User {} not found; dropping", raw.login);
                return ItemOutcome::Absent;
            }
            Err(EngineError::Aborted) => return ItemOutcome::Failed(EngineError::Aborted.to_string()),
            Err(error) => match retry.fail() {
                Some(delay) => {
                    tracing::debug!(
                        "User {} failed ({}/{}): {}",
                        raw.login,
                        retry.attempts(),
                        retry.max_attempts(),
                        error
                    );
                    if let Err(aborted) = client.cancel_token().sleep(delay).await {
                        return ItemOutcome::Failed(aborted.to_string());
                    }
                }
                None => {
                    let failure = EngineError::ItemEnrichmentFailure {
                        login: raw.login.clone(),
                        reason: format!("{} (after {} attempts)", error, retry.attempts()),
                    };
                    tracing::warn!("⚠️ {}", failure);
                    return ItemOutcome::Failed(failure.to_string());
                }
            },
        }
    }
}

async fn fetch_user<T: HttpTransport>(
    client: &ApiClient<T>,
    config: &EngineConfig,
    raw: &RawStargazer,
) -> Result<Option<EnrichedUser>> {
    let settings = &config.enrichment;
    let url = client.url(&format!("/users/{}", raw.login));
    let response = client
        .execute(&url, settings.profile_timeout(), settings.profile_transport_attempts)
        .await?;

    if response.status == 404 {
        return Ok(None);
    }
    if !response.is_success() {
        return Err(EngineError::HttpStatus {
            status: response.status,
            url,
        });
    }

    let profile: UserProfile = response.json()?;
    let stars = total_stars(client, &config.stars, &raw.login).await;
    Ok(Some(EnrichedUser::from_profile(raw, profile, stars)))
}
