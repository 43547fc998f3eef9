//! Quay component status: per-component readiness checkers and the
//! aggregator that merges their conditions into a registry's status.
//!
//! Checkers only read. Domain outcomes (unmanaged, missing, foreign-owned,
//! degraded, scaled down, ready) come back as a [`quay_core::Condition`];
//! [`CheckError`] is reserved for lookups that could not complete.

#![forbid(unsafe_code)]

mod aggregator;
mod checker;
mod context;
pub mod deployment;

pub use aggregator::{EvaluationReport, StatusAggregator};
pub use checker::{CheckError, Checker};
pub use context::CheckContext;
pub use deployment::{profile_for, DeploymentChecker, DeploymentProfile, DEPLOYMENT_PROFILES};
