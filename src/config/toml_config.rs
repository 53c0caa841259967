use crate::utils::error::{EngineError, Result};
use crate::utils::retry::Backoff;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";
pub const DEFAULT_USER_AGENT: &str = "stargazer-etl";

/// Every tunable of the engine. All keys are optional in the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api: ApiConfig,
    pub transport: TransportConfig,
    pub pagination: PaginationConfig,
    pub enrichment: EnrichmentConfig,
    pub stars: StarsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub accept: String,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            accept: STAR_MEDIA_TYPE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1000,
            backoff_cap_ms: 5000,
        }
    }
}

impl TransportConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.backoff_base_ms, self.backoff_cap_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: u32,
    pub timeout_ms: u64,
    pub max_consecutive_errors: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub page_delay_ms: u64,
    pub rate_limit_margin_ms: u64,
    pub rate_limit_tick_ms: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            timeout_ms: 10_000,
            max_consecutive_errors: 5,
            backoff_base_ms: 1000,
            backoff_cap_ms: 10_000,
            page_delay_ms: 100,
            rate_limit_margin_ms: 1000,
            rate_limit_tick_ms: 10_000,
        }
    }
}

impl PaginationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.backoff_base_ms, self.backoff_cap_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub batch_size: usize,
    pub max_batch_attempts: u32,
    pub batch_backoff_base_ms: u64,
    pub batch_backoff_cap_ms: u64,
    pub item_max_attempts: u32,
    pub item_backoff_base_ms: u64,
    pub item_backoff_cap_ms: u64,
    pub profile_timeout_ms: u64,
    pub profile_transport_attempts: u32,
    pub batch_delay_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_batch_attempts: 3,
            batch_backoff_base_ms: 1000,
            batch_backoff_cap_ms: 5000,
            item_max_attempts: 3,
            item_backoff_base_ms: 500,
            item_backoff_cap_ms: 3000,
            profile_timeout_ms: 10_000,
            profile_transport_attempts: 2,
            batch_delay_ms: 1000,
        }
    }
}

impl EnrichmentConfig {
    pub fn batch_backoff(&self) -> Backoff {
        Backoff::new(self.batch_backoff_base_ms, self.batch_backoff_cap_ms)
    }

    pub fn item_backoff(&self) -> Backoff {
        Backoff::new(self.item_backoff_base_ms, self.item_backoff_cap_ms)
    }

    pub fn profile_timeout(&self) -> Duration {
        Duration::from_millis(self.profile_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarsConfig {
    pub max_pages: u32,
    pub per_page: u32,
    pub timeout_ms: u64,
    pub transport_attempts: u32,
    pub max_consecutive_errors: u32,
    pub retry_delay_ms: u64,
}

impl Default for StarsConfig {
    fn default() -> Self {
        Self {
            max_pages: 3,
            per_page: 100,
            timeout_ms: 5000,
            transport_attempts: 2,
            max_consecutive_errors: 2,
            retry_delay_ms: 500,
        }
    }
}

impl StarsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl EngineConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EngineError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML text after substituting `${VAR}` environment references.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let config: Self =
            toml::from_str(&processed_content).map_err(|e| EngineError::ConfigError {
                message: format!("TOML parsing error: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EngineError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url)?;
        validation::validate_non_empty_string("api.accept", &self.api.accept)?;
        validation::validate_non_empty_string("api.user_agent", &self.api.user_agent)?;

        validation::validate_positive_number("transport.max_attempts", self.transport.max_attempts, 1)?;

        validation::validate_range("pagination.page_size", self.pagination.page_size, 1, 100)?;
        validation::validate_positive_number(
            "pagination.max_consecutive_errors",
            self.pagination.max_consecutive_errors,
            1,
        )?;
        validation::validate_positive_number("pagination.timeout_ms", self.pagination.timeout_ms, 1)?;

        validation::validate_positive_number("enrichment.batch_size", self.enrichment.batch_size, 1)?;
        validation::validate_positive_number(
            "enrichment.max_batch_attempts",
            self.enrichment.max_batch_attempts,
            1,
        )?;
        validation::validate_positive_number(
            "enrichment.item_max_attempts",
            self.enrichment.item_max_attempts,
            1,
        )?;
        validation::validate_positive_number(
            "enrichment.profile_transport_attempts",
            self.enrichment.profile_transport_attempts,
            1,
        )?;
        validation::validate_positive_number(
            "enrichment.profile_timeout_ms",
            self.enrichment.profile_timeout_ms,
            1,
        )?;

        validation::validate_range("stars.per_page", self.stars.per_page, 1, 100)?;
        validation::validate_positive_number("stars.transport_attempts", self.stars.transport_attempts, 1)?;
        validation::validate_positive_number(
            "stars.max_consecutive_errors",
            self.stars.max_consecutive_errors,
            1,
        )?;
        validation::validate_positive_number("stars.timeout_ms", self.stars.timeout_ms, 1)?;

        Ok(())
    }
}
