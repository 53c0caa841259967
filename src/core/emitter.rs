use crate::domain::model::{EnrichedUser, ProgressEvent, RunOutcome};
use crate::utils::cancel::CancelToken;
use crate::utils::error::{EngineError, Result};
use tokio::sync::mpsc;

/// Sending half of a run's event stream.
///
/// Sends wait for channel capacity, so a slow consumer applies backpressure
/// to the run. A full channel never outlasts cancellation: a pending send
/// gives up with `Aborted` once the run's token fires. A dropped receiver
/// is not an error; the run keeps going and still returns its outcome.
#[derive(Debug, Clone)]
pub struct ProgressEmitter {
    sender: mpsc::Sender<ProgressEvent>,
    cancel: CancelToken,
}

impl ProgressEmitter {
    pub fn new(sender: mpsc::Sender<ProgressEvent>, cancel: CancelToken) -> Self {
        Self { sender, cancel }
    }

    pub async fn emit(&self, event: ProgressEvent) -> Result<()> {
        tracing::debug!("📣 {}", event.message());
        if self.cancel.guard(self.sender.send(event)).await?.is_err() {
            tracing::debug!("Progress receiver dropped; event discarded");
        }
        Ok(())
    }

    pub async fn progress(&self, message: impl Into<String>, total: usize, processed: usize) -> Result<()> {
        self.emit(ProgressEvent::progress(message, total, processed)).await
    }

    /// Listing-phase progress. Carries the cap but no processed count, which
    /// only starts moving once enrichment begins.
    pub async fn listing(&self, message: impl Into<String>, total: usize) -> Result<()> {
        self.emit(ProgressEvent::Progress {
            message: message.into(),
            total: Some(total),
            processed: None,
            users: None,
        })
        .await
    }

    /// Emits the terminal event for a failed run. Cancellation yields no event.
    pub async fn terminate(&self, error: EngineError) -> RunOutcome {
        if error.is_aborted() {
            tracing::info!("⏹️ Run stopped by caller");
            return RunOutcome::Stopped;
        }

        tracing::error!(
            "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
            error,
            error.category(),
            error.severity()
        );
        let message = error.to_string();
        let sent = self
            .emit(ProgressEvent::Error {
                message: message.clone(),
            })
            .await;
        if sent.is_err() {
            tracing::info!("⏹️ Run stopped by caller while reporting failure");
            return RunOutcome::Stopped;
        }
        RunOutcome::Failed {
            message,
            severity: error.severity(),
        }
    }
}

/// Running totals of the enrichment phase.
///
/// `processed` counts every stargazer whose batch resolved, including
/// dropped and skipped ones, so it can exceed `users.len()`.
#[derive(Debug)]
pub struct Aggregator {
    emitter: ProgressEmitter,
    total: usize,
    processed: usize,
    users: Vec<EnrichedUser>,
}

impl Aggregator {
    pub fn new(emitter: ProgressEmitter, total: usize) -> Self {
        Self {
            emitter,
            total,
            processed: 0,
            users: Vec::with_capacity(total),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn users(&self) -> &[EnrichedUser] {
        &self.users
    }

    pub async fn progress(&self, message: impl Into<String>) -> Result<()> {
        self.emitter.progress(message, self.total, self.processed).await
    }

    /// Records a resolved batch and emits it with the updated processed count.
    pub async fn record_batch(&mut self, batch_len: usize, users: Vec<EnrichedUser>) -> Result<()> {
        self.processed += batch_len;
        self.users.extend(users.iter().cloned());
        let message = format!("Processed {} of {} users", self.processed, self.total);
        self.emitter
            .emit(ProgressEvent::batch(message, self.total, self.processed, users))
            .await
    }

    /// Records a batch given up on. Its items still count as processed.
    pub async fn skip_batch(&mut self, batch_len: usize, message: impl Into<String>) -> Result<()> {
        self.processed += batch_len;
        self.emitter
            .emit(ProgressEvent::batch(message, self.total, self.processed, Vec::new()))
            .await
    }

    pub async fn complete(self) -> RunOutcome {
        let message = format!(
            "Analysis complete! Successfully processed {} users out of {} stargazers.",
            self.users.len(),
            self.total
        );
        let sent = self
            .emitter
            .emit(ProgressEvent::Complete {
                message: message.clone(),
                total: self.users.len(),
                users: self.users.clone(),
            })
            .await;
        if let Err(error) = sent {
            return self.emitter.terminate(error).await;
        }
        tracing::info!("✅ {}", message);
        RunOutcome::Completed {
            users: self.users,
            processed: self.processed,
        }
    }

    pub async fn fail(self, error: EngineError) -> RunOutcome {
        self.emitter.terminate(error).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(login: &str) -> EnrichedUser {
        EnrichedUser {
            login: login.to_string(),
            name: login.to_string(),
            avatar_url: String::new(),
            html_url: String::new(),
            followers: 0,
            following: 0,
            public_repos: 0,
            created_at: None,
            location: None,
            company: None,
            blog: None,
            bio: None,
            total_stars: 0,
            starred_at: None,
        }
    }

    #[tokio::test]
    async fn test_aggregator_counts_skipped_batches_as_processed() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut aggregator = Aggregator::new(ProgressEmitter::new(tx, CancelToken::new()), 10);

        aggregator.record_batch(5, vec![user("a"), user("b")]).await.unwrap();
        aggregator.skip_batch(5, "Skipping batch 6-10").await.unwrap();
        assert_eq!(aggregator.processed(), 10);
        assert_eq!(aggregator.users().len(), 2);

        let outcome = aggregator.complete().await;
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                users: vec![user("a"), user("b")],
                processed: 10
            }
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.processed(), Some(5));
        match first {
            ProgressEvent::Progress { users, .. } => assert_eq!(users.unwrap().len(), 2),
            other => panic!("unexpected event {other:?}"),
        }
        let second = rx.recv().await.unwrap();
        assert_eq!(second.processed(), Some(10));
        let last = rx.recv().await.unwrap();
        assert!(matches!(last, ProgressEvent::Complete { total: 2, .. }));
    }

    #[tokio::test]
    async fn test_terminate_on_abort_emits_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        let emitter = ProgressEmitter::new(tx, CancelToken::new());

        let outcome = emitter.terminate(EngineError::Aborted).await;
        assert_eq!(outcome, RunOutcome::Stopped);
        drop(emitter);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_terminate_on_failure_emits_error_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let emitter = ProgressEmitter::new(tx, CancelToken::new());

        let outcome = emitter.terminate(EngineError::NoStargazers).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }));
        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::Error {
                message: "No stargazers found for this repository".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_fail_emit() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let emitter = ProgressEmitter::new(tx, CancelToken::new());
        emitter.progress("still running", 1, 0).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_releases_send_blocked_on_full_channel() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancelToken::new();
        let emitter = ProgressEmitter::new(tx, cancel.clone());
        emitter.progress("fills the buffer", 2, 0).await.unwrap();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let blocked = emitter.progress("waits for capacity", 2, 1).await;
        assert!(matches!(blocked, Err(EngineError::Aborted)));
    }

    #[tokio::test]
    async fn test_complete_after_cancel_is_stopped() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancelToken::new();
        let mut aggregator = Aggregator::new(ProgressEmitter::new(tx, cancel.clone()), 1);
        aggregator.record_batch(1, vec![user("a")]).await.unwrap();
        cancel.cancel();

        assert_eq!(aggregator.complete().await, RunOutcome::Stopped);
        assert_eq!(rx.recv().await.unwrap().processed(), Some(1));
        assert!(rx.recv().await.is_none());
    }
}
