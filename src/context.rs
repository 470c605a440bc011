//! Cancellable call context shared by every provisioning operation.
//!
//! A [`CallContext`] bounds a call by an optional deadline and a
//! [`CancellationToken`]. Backends race each backend request and each poll
//! sleep against [`CallContext::done`], so a caller-imposed timeout aborts the
//! wait promptly and drops the in-flight request future.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::{ProvisionError, Stage};

/// Deadline and cancellation scope for a single provisioning call.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl CallContext {
    /// Context without a deadline that only ends when cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    ///
    /// A timeout too large to represent as an instant yields a context
    /// without a deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or_else(Self::new, Self::with_deadline)
    }

    /// Context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            token: CancellationToken::new(),
        }
    }

    /// Derives a context sharing this cancellation token whose deadline is
    /// the earlier of the current one and `timeout` from now.
    ///
    /// An unrepresentable `timeout` keeps the current deadline.
    #[must_use]
    pub fn bounded(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(current), Some(candidate)) => Some(current.min(candidate)),
            (current, None) => current,
            (None, candidate) => candidate,
        };
        Self {
            deadline,
            token: self.token.clone(),
        }
    }

    /// Deadline of this context, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Token that cancels this context (and every context derived from it).
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels the context.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the context has been cancelled or its deadline has passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
            || self
                .deadline
                .is_some_and(|deadline| deadline <= Instant::now())
    }

    /// Resolves once the context is cancelled or its deadline has passed.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Error describing why the context ended, attributed to `stage`.
    #[must_use]
    pub fn interruption(&self, stage: Stage) -> ProvisionError {
        if self.token.is_cancelled() {
            ProvisionError::Cancelled { stage }
        } else {
            ProvisionError::DeadlineExceeded { stage }
        }
    }

    /// Runs `operation` unless the context ends first.
    ///
    /// A context that has already ended wins over a ready operation, so an
    /// expired deadline never lets a backend call through.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Cancelled`] or
    /// [`ProvisionError::DeadlineExceeded`] when the context ends first, and
    /// otherwise whatever `operation` returns.
    pub async fn run<T, F>(&self, stage: Stage, operation: F) -> Result<T, ProvisionError>
    where
        F: Future<Output = Result<T, ProvisionError>>,
    {
        if self.is_done() {
            return Err(self.interruption(stage));
        }
        tokio::select! {
            biased;
            () = self.done() => Err(self.interruption(stage)),
            outcome = operation => outcome,
        }
    }

    /// Sleeps for `period` unless the context ends first.
    ///
    /// # Errors
    ///
    /// Returns the interruption error when the context ends before the sleep
    /// completes.
    pub async fn sleep(&self, stage: Stage, period: Duration) -> Result<(), ProvisionError> {
        self.run(stage, async {
            tokio::time::sleep(period).await;
            Ok(())
        })
        .await
    }
}
