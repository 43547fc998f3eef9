//! Readiness of components backed by a single Deployment.
//!
//! Evaluation order, first match wins:
//! 1. unmanaged component: ready, no lookup
//! 2. deployment missing: not ready
//! 3. deployment not owned by this registry: not ready
//! 4. replicas overridden to zero: ready, availability ignored
//! 5. `Available` condition not `True` (or absent): not ready, message passed through

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use quay_core::{ComponentKind, Condition, ConditionReason, ConditionStatus, ManagedResource, QuayRegistry};
use quay_kubehub::ResourceAccessor;
use tracing::{debug, warn};

use crate::{CheckContext, CheckError, Checker};

/// Static description of a deployment-backed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentProfile {
    pub kind: ComponentKind,
    /// Appended to the registry name to form the deployment name.
    pub suffix: &'static str,
    pub ready_message: &'static str,
}

pub const MIRROR: DeploymentProfile = DeploymentProfile {
    kind: ComponentKind::Mirror,
    suffix: "quay-mirror",
    ready_message: "Mirror components healthy",
};

pub const QUAY: DeploymentProfile = DeploymentProfile {
    kind: ComponentKind::Quay,
    suffix: "quay-app",
    ready_message: "Quay component healthy",
};

pub const CLAIR: DeploymentProfile = DeploymentProfile {
    kind: ComponentKind::Clair,
    suffix: "clair-app",
    ready_message: "Clair component healthy",
};

pub const REDIS: DeploymentProfile = DeploymentProfile {
    kind: ComponentKind::Redis,
    suffix: "quay-redis",
    ready_message: "Redis component healthy",
};

pub const POSTGRES: DeploymentProfile = DeploymentProfile {
    kind: ComponentKind::Postgres,
    suffix: "quay-database",
    ready_message: "Postgres component healthy",
};

pub const CLAIR_POSTGRES: DeploymentProfile = DeploymentProfile {
    kind: ComponentKind::ClairPostgres,
    suffix: "clair-postgres",
    ready_message: "ClairPostgres component healthy",
};

pub const DEPLOYMENT_PROFILES: [DeploymentProfile; 6] = [QUAY, CLAIR, CLAIR_POSTGRES, POSTGRES, REDIS, MIRROR];

pub fn profile_for(kind: ComponentKind) -> Option<DeploymentProfile> {
    DEPLOYMENT_PROFILES.iter().copied().find(|p| p.kind == kind)
}

/// Checker for one deployment-backed component.
pub struct DeploymentChecker {
    profile: DeploymentProfile,
    accessor: Arc<dyn ResourceAccessor>,
}

impl DeploymentChecker {
    pub fn new(profile: DeploymentProfile, accessor: Arc<dyn ResourceAccessor>) -> Self {
        Self { profile, accessor }
    }

    pub fn mirror(accessor: Arc<dyn ResourceAccessor>) -> Self { Self::new(MIRROR, accessor) }
    pub fn quay(accessor: Arc<dyn ResourceAccessor>) -> Self { Self::new(QUAY, accessor) }
    pub fn clair(accessor: Arc<dyn ResourceAccessor>) -> Self { Self::new(CLAIR, accessor) }
    pub fn redis(accessor: Arc<dyn ResourceAccessor>) -> Self { Self::new(REDIS, accessor) }
    pub fn postgres(accessor: Arc<dyn ResourceAccessor>) -> Self { Self::new(POSTGRES, accessor) }
    pub fn clair_postgres(accessor: Arc<dyn ResourceAccessor>) -> Self { Self::new(CLAIR_POSTGRES, accessor) }

    fn condition(&self, status: ConditionStatus, reason: ConditionReason, message: String) -> Condition {
        Condition::new(self.profile.kind.condition_type(), status, reason, message)
    }

    fn not_ready(&self, message: String) -> Condition {
        self.condition(ConditionStatus::False, ConditionReason::ComponentNotReady, message)
    }

    fn ready(&self, message: String) -> Condition {
        self.condition(ConditionStatus::True, ConditionReason::ComponentReady, message)
    }

    async fn evaluate(&self, ctx: &CheckContext, reg: &QuayRegistry) -> Result<Condition, CheckError> {
        let p = &self.profile;
        if !reg.is_managed(p.kind) {
            return Ok(Condition::unmanaged(p.kind));
        }
        let display = p.kind.display_name();

        let name = reg.resource_name(p.suffix);
        let found = ctx.run(self.accessor.get(&reg.namespace, &name)).await?;
        let Some(res) = found else {
            return Ok(self.not_ready(format!("{} deployment not found", display)));
        };

        if !reg.owns(&res) {
            return Ok(self.not_ready(format!("{} deployment not owned by QuayRegistry", display)));
        }

        if reg.replicas_override(p.kind) == Some(0) {
            return Ok(self.ready(format!("{} manually scaled down", display)));
        }

        Ok(self.availability(&res))
    }

    fn availability(&self, res: &ManagedResource) -> Condition {
        match res.available_condition() {
            Some(c) if c.status == ConditionStatus::True => self.ready(self.profile.ready_message.to_string()),
            Some(c) => self.not_ready(format!("Deployment {}: {}", res.name, c.message)),
            // freshly created deployments report no conditions yet
            None => self.not_ready(format!("Deployment {}: Available condition not reported", res.name)),
        }
    }
}

#[async_trait::async_trait]
impl Checker for DeploymentChecker {
    fn kind(&self) -> ComponentKind { self.profile.kind }

    async fn check(&self, ctx: &CheckContext, reg: &QuayRegistry) -> Result<Condition, CheckError> {
        let t0 = Instant::now();
        let kind = self.profile.kind.as_str();
        let res = self.evaluate(ctx, reg).await;
        histogram!("component_check_seconds", t0.elapsed().as_secs_f64(), "kind" => kind);
        match &res {
            Ok(cond) => {
                counter!("component_checks_total", 1, "kind" => kind, "reason" => cond.reason.as_str());
                debug!(kind, registry = %reg.name, status = cond.status.as_str(), reason = cond.reason.as_str(), took_ms = %t0.elapsed().as_millis(), "component checked");
            }
            Err(e) => {
                counter!("component_check_errors_total", 1, "kind" => kind);
                warn!(kind, registry = %reg.name, error = %e, "component check failed");
            }
        }
        res
    }
}
