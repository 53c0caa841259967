use crate::config::StarsConfig;
use crate::core::transport::ApiClient;
use crate::domain::model::RepoStars;
use crate::domain::ports::HttpTransport;
use crate::utils::error::EngineError;
use std::time::Duration;

/// Sums `stargazers_count` over the user's most recently updated repositories.
///
/// Never fails: a 404 or an empty page ends the walk, and repeated errors
/// end it with whatever was summed so far.
pub async fn total_stars<T: HttpTransport>(client: &ApiClient<T>, settings: &StarsConfig, login: &str) -> u64 {
    let cancel = client.cancel_token();
    let mut total: u64 = 0;
    let mut page: u32 = 1;
    let mut consecutive_errors: u32 = 0;

    while page <= settings.max_pages && consecutive_errors < settings.max_consecutive_errors {
        let url = client.url(&format!(
            "/users/{}/repos?page={}&per_page={}&sort=updated",
            login, page, settings.per_page
        ));

        let failure = match client
            .execute(&url, settings.timeout(), settings.transport_attempts)
            .await
        {
            Err(EngineError::Aborted) => break,
            Err(error) => error,
            Ok(response) if response.status == 404 => break,
            Ok(response) if !response.is_success() => EngineError::HttpStatus {
                status: response.status,
                url: url.clone(),
            },
            Ok(response) => match response.json::<Vec<RepoStars>>() {
                Err(error) => error,
                Ok(repos) => {
                    if repos.is_empty() {
                        break;
                    }
                    let page_stars = repos
                        .iter()
                        .map(|repo| repo.stargazers_count.unwrap_or(0))
                        .fold(0u64, u64::saturating_add);
                    total = total.saturating_add(page_stars);
                    consecutive_errors = 0;
                    page += 1;
                    continue;
                }
            },
        };

        consecutive_errors += 1;
        tracing::debug!(
            "Repos page {} of {} failed ({}/{}): {}",
            page,
            login,
            consecutive_errors,
            settings.max_consecutive_errors,
            failure
        );
        if consecutive_errors >= settings.max_consecutive_errors {
            break;
        }
        if cancel
            .sleep(Duration::from_millis(settings.retry_delay_ms))
            .await
            .is_err()
        {
            break;
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ReqwestTransport;
    use crate::config::EngineConfig;
    use crate::utils::cancel::CancelToken;
    use httpmock::prelude::*;
    use std::sync::Arc;

    fn setup(base_url: String) -> (ApiClient<ReqwestTransport>, StarsConfig) {
        let mut config = EngineConfig::default();
        config.api.base_url = base_url;
        config.transport.backoff_base_ms = 0;
        config.stars.retry_delay_ms = 0;
        config.stars.transport_attempts = 1;
        let client = ApiClient::new(
            Arc::new(ReqwestTransport::new()),
            &config,
            "token",
            CancelToken::new(),
        );
        (client, config.stars)
    }

    #[tokio::test]
    async fn test_sums_single_page_and_stops_on_empty() {
        let server = MockServer::start_async().await;
        let page1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users/alice/repos")
                    .query_param("page", "1")
                    .query_param("per_page", "100")
                    .query_param("sort", "updated");
                then.status(200).json_body(serde_json::json!([
                    {"name": "a", "stargazers_count": 10},
                    {"name": "b", "stargazers_count": 0},
                    {"name": "c", "stargazers_count": 5}
                ]));
            })
            .await;
        let page2 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users/alice/repos")
                    .query_param("page", "2");
                then.status(200).json_body(serde_json::json!([]));
            })
            .await;

        let (client, settings) = setup(server.base_url());
        assert_eq!(total_stars(&client, &settings, "alice").await, 15);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_counts_are_zero() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users/bob/repos")
                    .query_param("page", "1");
                then.status(200)
                    .json_body(serde_json::json!([{"name": "x"}, {"stargazers_count": 4}]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users/bob/repos")
                    .query_param("page", "2");
                then.status(200).json_body(serde_json::json!([]));
            })
            .await;

        let (client, settings) = setup(server.base_url());
        assert_eq!(total_stars(&client, &settings, "bob").await, 4);
    }

    #[tokio::test]
    async fn test_not_found_yields_zero() {
        let server = MockServer::start_async().await;
        let repos = server
            .mock_async(|when, then| {
                when.method(GET).path("/users/ghost/repos");
                then.status(404);
            })
            .await;

        let (client, settings) = setup(server.base_url());
        assert_eq!(total_stars(&client, &settings, "ghost").await, 0);
        repos.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_reads_at_most_three_pages() {
        let server = MockServer::start_async().await;
        let repos = server
            .mock_async(|when, then| {
                when.method(GET).path("/users/prolific/repos");
                then.status(200)
                    .json_body(serde_json::json!([{"stargazers_count": 1}, {"stargazers_count": 2}]));
            })
            .await;

        let (client, settings) = setup(server.base_url());
        assert_eq!(total_stars(&client, &settings, "prolific").await, 9);
        repos.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn test_repeated_errors_return_partial_sum() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users/flaky/repos")
                    .query_param("page", "1");
                then.status(200).json_body(serde_json::json!([{"stargazers_count": 7}]));
            })
            .await;
        let failing = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users/flaky/repos")
                    .query_param("page", "2");
                then.status(500);
            })
            .await;

        let (client, settings) = setup(server.base_url());
        assert_eq!(total_stars(&client, &settings, "flaky").await, 7);
        failing.assert_hits_async(2).await;
    }
}
