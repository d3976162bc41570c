use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why an [`ExecutionContext`] is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CancellationError {
    /// The context's token was cancelled.
    #[error("context cancelled")]
    Cancelled,
    /// The context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellable execution context handed to every operation and compensation.
///
/// Cancellation is cooperative: the coordinator polls [`check`](Self::check)
/// before each forward step, and steps may poll it themselves while they run.
/// Nothing is ever interrupted.
///
/// Clones share the same token, so cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// Create a context that is never done until cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that is not linked to any other context.
    ///
    /// Rollback runs under a context created this way, so compensations are
    /// not blocked by the cancellation that triggered them.
    #[must_use]
    pub fn background(timeout: Option<Duration>) -> Self {
        let ctx = Self::new();
        match timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Wrap an existing cancellation token.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Bound this context by `timeout` from now.
    ///
    /// An earlier existing deadline is kept. A timeout too large to represent
    /// as an [`Instant`] leaves the context unbounded.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Bound this context by an absolute deadline.
    ///
    /// An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        });
        self
    }

    /// Derive a context that is cancelled whenever this one is, but whose own
    /// cancellation does not propagate back.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this context and every clone and child of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the token has been cancelled. Ignores the deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// Poll the context.
    ///
    /// # Errors
    ///
    /// Returns [`CancellationError::Cancelled`] if the token was cancelled, or
    /// [`CancellationError::DeadlineExceeded`] if the deadline has passed.
    /// Cancellation wins when both hold.
    pub fn check(&self) -> Result<(), CancellationError> {
        if self.token.is_cancelled() {
            return Err(CancellationError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(CancellationError::DeadlineExceeded)
            }
            _ => Ok(()),
        }
    }

    /// The deadline, if one is set.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// The underlying cancellation token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
