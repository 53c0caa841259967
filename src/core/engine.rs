use crate::adapters::ReqwestTransport;
use crate::config::EngineConfig;
use crate::core::emitter::{Aggregator, ProgressEmitter};
use crate::core::enricher::Enricher;
use crate::core::paginator::Paginator;
use crate::core::transport::ApiClient;
use crate::domain::model::{ProgressEvent, RunOutcome, RunRequest};
use crate::domain::ports::HttpTransport;
use crate::utils::cancel::CancelToken;
use crate::utils::error::EngineError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Collects and enriches the stargazers of one repository per run.
///
/// The engine holds no per-run state. Every run gets its own `ApiClient`
/// bound to the caller's token and cancellation handle, so runs can never
/// observe each other's cancellation.
pub struct StargazerEngine<T: HttpTransport> {
    transport: Arc<T>,
    config: Arc<EngineConfig>,
}

impl<T: HttpTransport> Clone for StargazerEngine<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: self.config.clone(),
        }
    }
}

impl StargazerEngine<ReqwestTransport> {
    pub fn with_reqwest(config: EngineConfig) -> Self {
        Self::new(ReqwestTransport::new(), config)
    }
}

impl<T: HttpTransport + 'static> StargazerEngine<T> {
    pub fn new(transport: T, config: EngineConfig) -> Self {
        Self::from_shared(Arc::new(transport), config)
    }

    pub fn from_shared(transport: Arc<T>, config: EngineConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs to completion, streaming events into `events`.
    ///
    /// Ends with exactly one `Complete` or `Error` event, or with no
    /// terminal event at all when `cancel` fires.
    pub async fn run(
        &self,
        request: RunRequest,
        cancel: CancelToken,
        events: mpsc::Sender<ProgressEvent>,
    ) -> RunOutcome {
        let emitter = ProgressEmitter::new(events, cancel.clone());
        let client = Arc::new(ApiClient::new(
            self.transport.clone(),
            &self.config,
            request.token.as_str(),
            cancel.clone(),
        ));

        tracing::info!(
            "🚀 Starting stargazer analysis for {}/{} (max {} users)",
            request.owner,
            request.repo,
            request.max_users
        );

        let stargazers = match Paginator::new(&client, &self.config, &emitter)
            .collect_stargazers(&request.owner, &request.repo, request.max_users)
            .await
        {
            Ok(stargazers) => stargazers,
            Err(error) => return emitter.terminate(error).await,
        };

        if stargazers.is_empty() {
            return emitter.terminate(EngineError::NoStargazers).await;
        }

        let mut aggregator = Aggregator::new(emitter, stargazers.len());
        let found = aggregator
            .progress(format!(
                "Found {} stargazers, starting detailed analysis...",
                stargazers.len()
            ))
            .await;
        if let Err(error) = found {
            return aggregator.fail(error).await;
        }

        let enricher = Enricher::new(client, self.config.clone());
        if let Err(error) = enricher.enrich(stargazers, &mut aggregator).await {
            return aggregator.fail(error).await;
        }

        if let Err(error) = cancel.check() {
            return aggregator.fail(error).await;
        }
        aggregator.complete().await
    }

    /// Starts a run on the runtime with a fresh cancellation token.
    ///
    /// The run is supervised by a second task, so a panic inside it still
    /// ends the stream with an `Error` event. Only the spawned tasks hold
    /// `events`; the stream closes as soon as the run is over.
    pub fn spawn(&self, request: RunRequest, events: mpsc::Sender<ProgressEvent>) -> RunHandle {
        let cancel = CancelToken::new();
        let engine = self.clone();
        let run_cancel = cancel.clone();
        let supervisor_cancel = cancel.clone();
        let run_events = events.clone();

        let task = tokio::spawn(async move {
            let run = tokio::spawn(async move { engine.run(request, run_cancel, run_events).await });
            match run.await {
                Ok(outcome) => outcome,
                Err(join_error) if join_error.is_cancelled() || supervisor_cancel.is_cancelled() => {
                    RunOutcome::Stopped
                }
                Err(join_error) => {
                    ProgressEmitter::new(events, supervisor_cancel)
                        .terminate(EngineError::unexpected(join_error.to_string()))
                        .await
                }
            }
        });

        RunHandle { cancel, task }
    }
}

/// A run started with [`StargazerEngine::spawn`].
///
/// Dropping the handle does not stop the run; call [`RunHandle::cancel`].
pub struct RunHandle {
    cancel: CancelToken,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Stops the run. Safe to call repeatedly and after the run finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(_) if self.cancel.is_cancelled() => RunOutcome::Stopped,
            Err(join_error) => {
                let error = EngineError::unexpected(join_error.to_string());
                tracing::error!("❌ Run supervisor failed: {}", error);
                RunOutcome::Failed {
                    message: error.to_string(),
                    severity: error.severity(),
                }
            }
        }
    }
}
