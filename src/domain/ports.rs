use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Header name/value pairs. Lookups are case-insensitive.
pub type Headers = Vec<(String, String)>;

/// A GET request against the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub headers: Headers,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }
}

/// A fully buffered upstream response. Any status code is a valid response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: value.to_string().into_bytes(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

pub fn header_get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// One HTTP attempt. Deadlines, retries and cancellation are layered on top
/// by [`crate::core::transport::ApiClient`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = ApiResponse::new(403)
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("x-ratelimit-reset", "1700000000");
        assert_eq!(response.header("x-ratelimit-remaining"), Some("0"));
        assert_eq!(response.header("X-RATELIMIT-RESET"), Some("1700000000"));
        assert_eq!(response.header("retry-after"), None);
    }

    #[test]
    fn test_json_body_round_trip() {
        let response = ApiResponse::json_body(200, &serde_json::json!([{"stargazers_count": 3}]));
        assert!(response.is_success());
        let value: Vec<serde_json::Value> = response.json().unwrap();
        assert_eq!(value[0]["stargazers_count"], 3);
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let mut response = ApiResponse::new(200);
        response.body = b"not json".to_vec();
        let result: Result<serde_json::Value> = response.json();
        assert!(matches!(
            result,
            Err(crate::utils::error::EngineError::Decode(_))
        ));
    }
}
