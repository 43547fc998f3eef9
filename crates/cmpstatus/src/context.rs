//! Cancellation and deadline carried into every check.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::CheckError;
use quay_kubehub::AccessError;

/// Bounded context for one evaluation. Clones share the same token.
#[derive(Debug, Clone)]
pub struct CheckContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for CheckContext {
    fn default() -> Self { Self::new() }
}

impl CheckContext {
    /// No deadline; only explicit cancellation ends it.
    pub fn new() -> Self {
        Self { cancel: CancellationToken::new(), deadline: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    /// Tighten the deadline; an earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(cur) if cur < deadline => cur,
            _ => deadline,
        });
        self
    }

    /// Context cancelled together with `self` but cancellable on its own.
    pub fn child(&self) -> Self {
        Self { cancel: self.cancel.child_token(), deadline: self.deadline }
    }

    pub fn cancel(&self) { self.cancel.cancel(); }

    pub fn is_cancelled(&self) -> bool { self.cancel.is_cancelled() }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Fail fast when the context is already done.
    pub fn ensure_live(&self) -> Result<(), CheckError> {
        if self.cancel.is_cancelled() {
            return Err(CheckError::Canceled);
        }
        match self.deadline {
            Some(d) if d <= Instant::now() => Err(CheckError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drive a lookup to completion unless the context ends first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, CheckError>
    where
        F: Future<Output = Result<T, AccessError>>,
    {
        self.ensure_live()?;
        let expiry = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CheckError::Canceled),
            _ = expiry => Err(CheckError::DeadlineExceeded),
            res = fut => res.map_err(CheckError::from),
        }
    }
}
