use crate::app::report::{OutputFormat, SortField, SortOrder};
use crate::domain::model::RunRequest;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "stargazer-etl")]
#[command(about = "Collect and enrich the stargazers of a GitHub repository")]
pub struct CliConfig {
    #[arg(long, help = "Repository owner (user or organization)")]
    pub owner: String,

    #[arg(long, help = "Repository name")]
    pub repo: String,

    #[arg(long, default_value = "100", help = "Maximum number of stargazers to analyze")]
    pub max_users: usize,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, default_value = "")]
    pub token: String,

    #[arg(long, help = "TOML file overriding engine settings")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    #[arg(long, value_enum, default_value = "total-stars")]
    pub sort_by: SortField,

    #[arg(long, value_enum, default_value = "desc")]
    pub order: SortOrder,

    #[arg(long, help = "Print every progress event as a JSON line on stderr")]
    pub events: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn run_request(&self) -> RunRequest {
        RunRequest::new(
            self.owner.trim(),
            self.repo.trim(),
            self.max_users,
            self.token.trim(),
        )
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("owner", &self.owner)?;
        validation::validate_non_empty_string("repo", &self.repo)?;
        validation::validate_positive_number("max_users", self.max_users, 1)?;
        Ok(())
    }
}
