use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::utils::error::ErrorSeverity;

/// What the caller asks the engine to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub owner: String,
    pub repo: String,
    pub max_users: usize,
    pub token: String,
}

impl RunRequest {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        max_users: usize,
        token: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            max_users,
            token: token.into(),
        }
    }
}

/// Minimal listing record. Consumed by the enricher and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StargazerWire")]
pub struct RawStargazer {
    pub login: String,
    pub starred_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct LoginOnly {
    login: String,
}

// The star media type wraps each user with its star timestamp; the plain
// media type returns bare user objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum StargazerWire {
    Starred {
        #[serde(default)]
        starred_at: Option<DateTime<Utc>>,
        user: LoginOnly,
    },
    Plain {
        login: String,
    },
}

impl From<StargazerWire> for RawStargazer {
    fn from(wire: StargazerWire) -> Self {
        match wire {
            StargazerWire::Starred { starred_at, user } => Self {
                login: user.login,
                starred_at,
            },
            StargazerWire::Plain { login } => Self {
                login,
                starred_at: None,
            },
        }
    }
}

/// Profile payload of `GET /users/{login}`. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    pub login: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub public_repos: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub bio: Option<String>,
}

/// Repository entry of `GET /users/{login}/repos`; only the star count matters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoStars {
    pub stargazers_count: Option<u64>,
}

/// A stargazer with profile data and their total stars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedUser {
    pub login: String,
    pub name: String,
    pub avatar_url: String,
    pub html_url: String,
    pub followers: u64,
    pub following: u64,
    pub public_repos: u64,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub total_stars: u64,
    pub starred_at: Option<DateTime<Utc>>,
}

impl EnrichedUser {
    pub fn from_profile(raw: &RawStargazer, profile: UserProfile, total_stars: u64) -> Self {
        // the listing login is the key, whatever the profile reports
        let login = raw.login.clone();
        let name = profile
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| login.clone());

        Self {
            name,
            avatar_url: profile.avatar_url.unwrap_or_default(),
            html_url: profile.html_url.unwrap_or_default(),
            followers: profile.followers.unwrap_or(0),
            following: profile.following.unwrap_or(0),
            public_repos: profile.public_repos.unwrap_or(0),
            created_at: profile.created_at,
            location: profile.location,
            company: profile.company,
            blog: profile.blog,
            bio: profile.bio,
            total_stars,
            starred_at: raw.starred_at,
            login,
        }
    }
}

/// Per-item result of enrichment. Absence (404) and failure stay distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Present(Box<EnrichedUser>),
    Absent,
    Failed(String),
}

impl ItemOutcome {
    pub fn into_user(self) -> Option<EnrichedUser> {
        match self {
            Self::Present(user) => Some(*user),
            Self::Absent | Self::Failed(_) => None,
        }
    }
}

/// Events streamed to the caller while a run progresses.
///
/// A run emits any number of `Progress` events followed by exactly one
/// `Complete` or `Error`, unless it is cancelled, in which case no terminal
/// event is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Progress {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        processed: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        users: Option<Vec<EnrichedUser>>,
    },
    Complete {
        message: String,
        users: Vec<EnrichedUser>,
        total: usize,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    pub fn progress(message: impl Into<String>, total: usize, processed: usize) -> Self {
        Self::Progress {
            message: message.into(),
            total: Some(total),
            processed: Some(processed),
            users: None,
        }
    }

    pub fn batch(message: impl Into<String>, total: usize, processed: usize, users: Vec<EnrichedUser>) -> Self {
        Self::Progress {
            message: message.into(),
            total: Some(total),
            processed: Some(processed),
            users: Some(users),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Progress { message, .. }
            | Self::Complete { message, .. }
            | Self::Error { message } => message,
        }
    }

    pub fn processed(&self) -> Option<usize> {
        match self {
            Self::Progress { processed, .. } => *processed,
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// How a run ended, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        users: Vec<EnrichedUser>,
        processed: usize,
    },
    Failed {
        message: String,
        severity: ErrorSeverity,
    },
    Stopped,
}
