use crate::domain::ports::{ApiRequest, ApiResponse, HttpTransport};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;

/// Production transport backed by a shared `reqwest::Client`.
///
/// Timeouts are not configured on the client; the caller wraps each attempt
/// in its own deadline so dropping the future cancels the request.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self.client.get(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        tracing::debug!("📡 GET {}", request.url);
        let response = builder.send().await?;
        let status = response.status().as_u16();
        tracing::debug!("📡 {} -> {}", request.url, status);

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
