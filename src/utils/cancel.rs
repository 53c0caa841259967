use crate::utils::error::{EngineError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Cancellation signal shared by every request of a single run.
///
/// A fresh token is created per run and owned by whoever started the run.
/// Clones observe the same signal. Cancelling is idempotent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    signal: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
        }
    }

    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.signal.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Fails fast with [`EngineError::Aborted`] when the run was cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EngineError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Drives `future` to completion unless the token fires first, in which
    /// case the future is dropped and `Aborted` is returned.
    pub async fn guard<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(EngineError::Aborted),
            output = future => Ok(output),
        }
    }

    /// Non-blocking sleep that ends early with `Aborted` on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return self.check();
        }
        self.guard(tokio::time::sleep(duration)).await
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().is_err());
    }

    #[tokio::test]
    async fn test_clones_share_the_signal() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_ends_early_on_cancel() {
        let token = CancelToken::new();
        let sleeper = token.clone();
        let handle = tokio::spawn(async move { sleeper.sleep(Duration::from_secs(3600)).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(EngineError::Aborted)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_cancel() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_secs(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_guard_rejects_already_cancelled_token() {
        let token = CancelToken::new();
        token.cancel();
        let result = token.guard(async { 42 }).await;
        assert!(matches!(result, Err(EngineError::Aborted)));
    }

    #[tokio::test]
    async fn test_fresh_tokens_are_independent() {
        let first = CancelToken::new();
        first.cancel();
        let second = CancelToken::new();
        assert!(!second.is_cancelled());
    }
}
