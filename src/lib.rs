//! Rate-limit aware collection and enrichment of GitHub stargazers.
//!
//! A run pages through a repository's stargazer listing, then resolves each
//! stargazer's profile and total stars in small concurrent batches, streaming
//! [`ProgressEvent`]s to the caller as it goes.

pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::EngineConfig;

pub use crate::adapters::ReqwestTransport;
pub use crate::app::{render_users, sort_users, OutputFormat, SortField, SortOrder};
pub use crate::core::engine::{RunHandle, StargazerEngine};
pub use crate::domain::model::{EnrichedUser, ProgressEvent, RawStargazer, RunOutcome, RunRequest};
pub use crate::domain::ports::{ApiRequest, ApiResponse, HttpTransport};
pub use crate::utils::cancel::CancelToken;
pub use crate::utils::error::{EngineError, Result};
