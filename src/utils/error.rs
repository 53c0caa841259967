use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Repository not found: {owner}/{repo}")]
    RepositoryNotFound { owner: String, repo: String },

    #[error("Rate limit reached, resets in {wait_ms}ms")]
    RateLimited { wait_ms: u64 },

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("GitHub API error: {status} ({url})")]
    HttpStatus { status: u16, url: String },

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    #[error("Failed to fetch stargazers after {count} consecutive errors")]
    ConsecutiveErrorsExceeded { count: u32 },

    #[error("Failed to enrich user {login}: {reason}")]
    ItemEnrichmentFailure { login: String, reason: String },

    #[error("Batch {start}-{end} failed: {reason}")]
    BatchFailure {
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("No stargazers found for this repository")]
    NoStargazers,

    #[error("Request aborted")]
    Aborted,

    #[error("Unexpected error: {message}")]
    Unexpected { message: String },

    #[error("Response decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    RateLimit,
    NotFound,
    Cancelled,
    Configuration,
    Data,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EngineError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Request(_)
            | Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::MaxRetriesExceeded { .. }
            | Self::ConsecutiveErrorsExceeded { .. } => ErrorCategory::Network,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::RepositoryNotFound { .. } | Self::NoStargazers => ErrorCategory::NotFound,
            Self::Aborted => ErrorCategory::Cancelled,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::Decode(_)
            | Self::CsvError(_)
            | Self::ItemEnrichmentFailure { .. }
            | Self::BatchFailure { .. } => ErrorCategory::Data,
            Self::IoError(_) | Self::Unexpected { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Aborted | Self::RateLimited { .. } | Self::ItemEnrichmentFailure { .. } => {
                ErrorSeverity::Low
            }
            Self::Request(_)
            | Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::MaxRetriesExceeded { .. }
            | Self::ConsecutiveErrorsExceeded { .. }
            | Self::BatchFailure { .. } => ErrorSeverity::Medium,
            Self::RepositoryNotFound { .. }
            | Self::NoStargazers
            | Self::Decode(_)
            | Self::CsvError(_)
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::High,
            Self::IoError(_) | Self::Unexpected { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::RepositoryNotFound { owner, repo } => {
                format!("Repository {}/{} was not found or is not accessible", owner, repo)
            }
            Self::ConsecutiveErrorsExceeded { count } => format!(
                "GitHub kept failing ({} errors in a row) while listing stargazers",
                count
            ),
            Self::NoStargazers => "This repository has no stargazers yet".to_string(),
            Self::Aborted => "The analysis was stopped".to_string(),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration value '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check your network connection and try again later",
            ErrorCategory::RateLimit => "Wait for the rate limit window to reset or use a token",
            ErrorCategory::NotFound => "Check the owner and repository names, and the token scopes",
            ErrorCategory::Cancelled => "Run the command again to restart the analysis",
            ErrorCategory::Configuration => "Fix the configuration file or command line arguments",
            ErrorCategory::Data => "GitHub returned unexpected data; retry or report the issue",
            ErrorCategory::Internal => "This is likely a bug; rerun with --verbose and report it",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_fatal() {
        let error = EngineError::RepositoryNotFound {
            owner: "octo".to_string(),
            repo: "missing".to_string(),
        };
        assert_eq!(error.category(), ErrorCategory::NotFound);
        assert_eq!(error.severity(), ErrorSeverity::High);
        assert_eq!(error.to_string(), "Repository not found: octo/missing");
    }

    #[test]
    fn test_transport_failures_are_network_errors() {
        let timeout = EngineError::Timeout {
            url: "http://x".to_string(),
            timeout_ms: 10,
        };
        assert_eq!(timeout.category(), ErrorCategory::Network);
        assert!(timeout.to_string().contains("timed out"));
        assert_eq!(
            EngineError::transport("connection reset").category(),
            ErrorCategory::Network
        );
        assert!(!EngineError::transport("connection reset").is_aborted());
    }

    #[test]
    fn test_aborted_is_low_severity_cancellation() {
        let error = EngineError::Aborted;
        assert!(error.is_aborted());
        assert_eq!(error.category(), ErrorCategory::Cancelled);
        assert_eq!(error.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_consecutive_errors_message() {
        let error = EngineError::ConsecutiveErrorsExceeded { count: 5 };
        assert_eq!(
            error.to_string(),
            "Failed to fetch stargazers after 5 consecutive errors"
        );
        assert!(error.user_friendly_message().contains("5 errors in a row"));
    }
}
