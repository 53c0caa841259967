use crate::domain::model::EnrichedUser;
use crate::utils::error::{EngineError, Result};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SortField {
    #[default]
    TotalStars,
    Followers,
    PublicRepos,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
    Json,
}

/// Sorts in place. Ties fall back to login so output is stable across runs.
pub fn sort_users(users: &mut [EnrichedUser], field: SortField, order: SortOrder) {
    users.sort_by(|a, b| {
        let primary = match field {
            SortField::TotalStars => a.total_stars.cmp(&b.total_stars),
            SortField::Followers => a.followers.cmp(&b.followers),
            SortField::PublicRepos => a.public_repos.cmp(&b.public_repos),
            // missing creation dates sort first when ascending
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let primary = match order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        match primary {
            Ordering::Equal => a.login.cmp(&b.login),
            other => other,
        }
    });
}

// Flat row so every record has the same column count.
#[derive(Serialize)]
struct UserRow<'a> {
    login: &'a str,
    name: &'a str,
    total_stars: u64,
    followers: u64,
    following: u64,
    public_repos: u64,
    created_at: String,
    starred_at: String,
    location: &'a str,
    company: &'a str,
    blog: &'a str,
    html_url: &'a str,
    avatar_url: &'a str,
}

impl<'a> From<&'a EnrichedUser> for UserRow<'a> {
    fn from(user: &'a EnrichedUser) -> Self {
        Self {
            login: &user.login,
            name: &user.name,
            total_stars: user.total_stars,
            followers: user.followers,
            following: user.following,
            public_repos: user.public_repos,
            created_at: user.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            starred_at: user.starred_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            location: user.location.as_deref().unwrap_or_default(),
            company: user.company.as_deref().unwrap_or_default(),
            blog: user.blog.as_deref().unwrap_or_default(),
            html_url: &user.html_url,
            avatar_url: &user.avatar_url,
        }
    }
}

/// Renders users as a delimited table or a pretty JSON array.
pub fn render_users(users: &[EnrichedUser], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(users)?),
        OutputFormat::Csv => render_delimited(users, b','),
        OutputFormat::Tsv => render_delimited(users, b'\t'),
    }
}

fn render_delimited(users: &[EnrichedUser], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    for user in users {
        writer.serialize(UserRow::from(user))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| EngineError::unexpected(e.to_string()))
}
