//! Call Context
//!
//! Deadline and cancellation shared by every search-service call made on
//! behalf of one request, including calls made from spawned worker tasks.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::core::search::{Result, SearchError};

/// Request-scoped deadline and cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    /// One signal per cancellable ancestor; never empty
    signals: Vec<watch::Receiver<bool>>,
}

/// Cancels every call running under the contexts derived from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all be gone already; nothing left to cancel then.
        let _ = self.tx.send(true);
    }
}

impl CallContext {
    /// A context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            deadline: None,
            signals: vec![rx],
        }
    }

    /// Derive a cancellable context. It is also cancelled with its parent;
    /// cancelling the handle leaves the parent untouched.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut signals = self.signals.clone();
        signals.push(rx);
        let ctx = Self {
            deadline: self.deadline,
            signals,
        };
        (ctx, CancelHandle { tx })
    }

    /// Derive a context that expires after `timeout` (or earlier, if the
    /// parent's deadline comes first).
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            signals: self.signals.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.signals.iter().any(|rx| *rx.borrow())
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if matches!(self.deadline, Some(d) if d <= Instant::now()) {
            return Err(SearchError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let cancellation = futures::future::select_all(
            self.signals
                .iter()
                .cloned()
                .map(|rx| Box::pin(wait_for_cancel(rx))),
        );

        let work = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(SearchError::DeadlineExceeded),
                },
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancellation => Err(SearchError::Cancelled),
            result = work => result,
        }
    }

    /// Sleep for `delay`, honouring cancellation and deadline.
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return Ok(());
        }
        self.run(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

async fn wait_for_cancel(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped without cancelling: never fires.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}
