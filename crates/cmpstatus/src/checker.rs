use quay_core::{ComponentKind, Condition, QuayRegistry};
use quay_kubehub::AccessError;

use crate::CheckContext;

/// Infrastructure failures only. Every domain outcome is a [`Condition`].
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("check canceled")]
    Canceled,
    #[error("check deadline exceeded")]
    DeadlineExceeded,
}

/// Readiness check for one component kind.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    fn kind(&self) -> ComponentKind;

    /// Classify the component's current state. Never returns a guessed
    /// condition when the lookup could not complete.
    async fn check(&self, ctx: &CheckContext, reg: &QuayRegistry) -> Result<Condition, CheckError>;
}
