#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use stargazer_etl::{
    ApiRequest, ApiResponse, EngineConfig, EngineError, HttpTransport, ProgressEvent, Result,
    RunOutcome, RunRequest, StargazerEngine,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const BASE_URL: &str = "http://scripted.test";

/// What the scripted upstream does with one request.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(ApiResponse),
    Fail(String),
    Hang,
    Panic,
}

impl Step {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Step::Respond(ApiResponse::json_body(status, &body))
    }

    pub fn status(status: u16) -> Self {
        Step::Respond(ApiResponse::new(status))
    }
}

/// In-memory upstream keyed by path and query.
///
/// Queued steps for a key are consumed in order; once a queue is empty the
/// key's sticky step applies, then the default world: every user exists
/// with no repositories and any other path is a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    queues: Mutex<HashMap<String, VecDeque<Step>>>,
    sticky: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, key: impl Into<String>, step: Step) {
        self.queues
            .lock()
            .unwrap()
            .entry(key.into())
            .or_default()
            .push_back(step);
    }

    pub fn always(&self, key: impl Into<String>, step: Step) {
        self.sticky.lock().unwrap().insert(key.into(), step);
    }

    /// Scripts the listing pages of a repository followed by an empty page.
    pub fn stargazer_pages(&self, owner: &str, repo: &str, pages: &[Vec<String>]) {
        for (index, logins) in pages.iter().enumerate() {
            let records: Vec<serde_json::Value> = logins
                .iter()
                .map(|login| json!({"starred_at": "2024-03-01T12:00:00Z", "user": {"login": login}}))
                .collect();
            self.push(
                listing_key(owner, repo, index as u32 + 1),
                Step::json(200, serde_json::Value::Array(records)),
            );
        }
        self.push(
            listing_key(owner, repo, pages.len() as u32 + 1),
            Step::json(200, json!([])),
        );
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, key: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url == format!("{}{}", BASE_URL, key))
            .count()
    }

    fn next_step(&self, key: &str) -> Step {
        if let Some(step) = self
            .queues
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
        {
            return step;
        }
        if let Some(step) = self.sticky.lock().unwrap().get(key) {
            return step.clone();
        }
        default_step(key)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let key = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        self.calls.lock().unwrap().push(request);

        match self.next_step(&key) {
            Step::Respond(response) => Ok(response),
            Step::Fail(message) => Err(EngineError::transport(message)),
            Step::Hang => std::future::pending::<Result<ApiResponse>>().await,
            Step::Panic => panic!("scripted transport panic for {}", key),
        }
    }
}

fn default_step(key: &str) -> Step {
    let path = key.split('?').next().unwrap_or(key);
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        ["users", login] => Step::json(200, profile(login)),
        ["users", _, "repos"] => Step::json(200, json!([])),
        _ => Step::status(404),
    }
}

pub fn profile(login: &str) -> serde_json::Value {
    json!({
        "login": login,
        "name": null,
        "avatar_url": format!("https://avatars.example/{}", login),
        "html_url": format!("https://github.com/{}", login),
        "followers": 3,
        "following": 1,
        "public_repos": 2,
        "created_at": "2015-06-01T00:00:00Z"
    })
}

pub fn listing_key(owner: &str, repo: &str, page: u32) -> String {
    format!("/repos/{}/{}/stargazers?page={}&per_page=100", owner, repo, page)
}

pub fn profile_key(login: &str) -> String {
    format!("/users/{}", login)
}

pub fn repos_key(login: &str, page: u32) -> String {
    format!("/users/{}/repos?page={}&per_page=100&sort=updated", login, page)
}

pub fn logins(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("{}{}", prefix, i)).collect()
}

pub fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.api.base_url = BASE_URL.to_string();
    config
}

pub fn engine(transport: &Arc<ScriptedTransport>) -> StargazerEngine<ScriptedTransport> {
    engine_with(transport, config())
}

pub fn engine_with(
    transport: &Arc<ScriptedTransport>,
    config: EngineConfig,
) -> StargazerEngine<ScriptedTransport> {
    StargazerEngine::from_shared(transport.clone(), config)
}

/// Runs to completion and returns the outcome with every emitted event.
pub async fn run_collect(
    engine: &StargazerEngine<ScriptedTransport>,
    request: RunRequest,
) -> (RunOutcome, Vec<ProgressEvent>) {
    let (tx, mut rx) = mpsc::channel(1024);
    let outcome = engine
        .run(request, stargazer_etl::CancelToken::new(), tx)
        .await;

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (outcome, events)
}

pub fn messages(events: &[ProgressEvent]) -> Vec<&str> {
    events.iter().map(ProgressEvent::message).collect()
}
