//! Runs the checkers for a registry's declared components and merges the results.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use quay_core::{ComponentKind, Condition, ConditionType, QuayRegistry, RegistryStatus};
use quay_kubehub::ResourceAccessor;
use tracing::{debug, info, warn};

use crate::{CheckContext, CheckError, Checker, DeploymentChecker, DEPLOYMENT_PROFILES};

/// Outcome of one evaluation pass. Whether a partial pass is acceptable is up to the caller.
#[derive(Debug, Default)]
pub struct EvaluationReport {
    /// Condition types written into the status: unmanaged kinds without a
    /// checker first, then checked kinds in declaration order.
    pub updated: Vec<ConditionType>,
    /// Components whose check hit an infrastructure error; their prior condition was kept.
    pub failed: Vec<(ComponentKind, CheckError)>,
    /// Declared, managed components with no registered checker.
    pub skipped: Vec<ComponentKind>,
}

impl EvaluationReport {
    pub fn is_complete(&self) -> bool { self.failed.is_empty() }
}

/// Kind → checker table built once at startup.
#[derive(Default)]
pub struct StatusAggregator {
    checkers: BTreeMap<ComponentKind, Arc<dyn Checker>>,
}

impl StatusAggregator {
    /// Aggregator with no checkers registered.
    pub fn empty() -> Self { Self::default() }

    /// Register a checker for every deployment-backed component, all sharing `accessor`.
    pub fn new(accessor: Arc<dyn ResourceAccessor>) -> Self {
        DEPLOYMENT_PROFILES.iter().fold(Self::empty(), |agg, p| {
            agg.with_checker(Arc::new(DeploymentChecker::new(*p, Arc::clone(&accessor))))
        })
    }

    /// Register `checker`, replacing any previous one for the same kind.
    pub fn with_checker(mut self, checker: Arc<dyn Checker>) -> Self {
        self.checkers.insert(checker.kind(), checker);
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ { self.checkers.keys().copied() }

    /// Evaluate a single component. `None` when no checker handles `kind`.
    pub async fn check_one(&self, ctx: &CheckContext, reg: &QuayRegistry, kind: ComponentKind) -> Option<Result<Condition, CheckError>> {
        let checker = self.checkers.get(&kind)?;
        Some(checker.check(ctx, reg).await)
    }

    /// Check every declared component concurrently, then upsert the results
    /// into `status` one by one.
    pub async fn evaluate(&self, ctx: &CheckContext, reg: &QuayRegistry, status: &mut RegistryStatus) -> EvaluationReport {
        let t0 = Instant::now();
        let mut report = EvaluationReport::default();
        let mut seen = BTreeSet::new();
        let mut pending: Vec<(ComponentKind, &Arc<dyn Checker>)> = Vec::new();
        // unmanaged kinds need no lookup, so they do not need a checker either
        let mut unmanaged = Vec::new();
        for component in &reg.spec.components {
            if !seen.insert(component.kind) {
                continue;
            }
            match self.checkers.get(&component.kind) {
                Some(checker) => pending.push((component.kind, checker)),
                None if !reg.is_managed(component.kind) => unmanaged.push(Condition::unmanaged(component.kind)),
                None => {
                    debug!(kind = %component.kind, "no checker registered; skipping");
                    report.skipped.push(component.kind);
                }
            }
        }

        let results = join_all(pending.into_iter().map(|(kind, checker)| async move { (kind, checker.check(ctx, reg).await) })).await;

        for cond in unmanaged {
            report.updated.push(cond.type_);
            status.upsert(cond);
        }
        for (kind, res) in results {
            match res {
                Ok(cond) => {
                    report.updated.push(cond.type_);
                    status.upsert(cond);
                }
                Err(e) => {
                    warn!(kind = %kind, registry = %reg.name, error = %e, "keeping previous condition");
                    report.failed.push((kind, e));
                }
            }
        }

        info!(
            registry = %reg.name,
            updated = report.updated.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            took_ms = %t0.elapsed().as_millis(),
            "status evaluated"
        );
        report
    }
}
