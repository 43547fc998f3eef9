//! Quay core types: registry spec, component kinds, observed resources and conditions.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod condition;
pub mod resource;

pub use condition::{Condition, ConditionReason, ConditionStatus, ConditionType, RegistryStatus};
pub use resource::{ManagedResource, OwnerRef, ResourceCondition};

/// API group/version of the QuayRegistry custom resource.
pub const API_GROUP: &str = "quay.redhat.com";
pub const API_VERSION: &str = "quay.redhat.com/v1";
pub const REGISTRY_KIND: &str = "QuayRegistry";

/// Closed set of components a QuayRegistry can declare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Base,
    Postgres,
    Clair,
    Redis,
    #[serde(rename = "horizontalpodautoscaler")]
    HorizontalPodAutoscaler,
    #[serde(rename = "objectstorage")]
    ObjectStorage,
    Route,
    Mirror,
    Monitoring,
    Tls,
    Quay,
    #[serde(rename = "clairpostgres")]
    ClairPostgres,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 12] = [
        ComponentKind::Base,
        ComponentKind::Postgres,
        ComponentKind::Clair,
        ComponentKind::Redis,
        ComponentKind::HorizontalPodAutoscaler,
        ComponentKind::ObjectStorage,
        ComponentKind::Route,
        ComponentKind::Mirror,
        ComponentKind::Monitoring,
        ComponentKind::Tls,
        ComponentKind::Quay,
        ComponentKind::ClairPostgres,
    ];

    /// Wire name as used in `spec.components[].kind`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Base => "base",
            ComponentKind::Postgres => "postgres",
            ComponentKind::Clair => "clair",
            ComponentKind::Redis => "redis",
            ComponentKind::HorizontalPodAutoscaler => "horizontalpodautoscaler",
            ComponentKind::ObjectStorage => "objectstorage",
            ComponentKind::Route => "route",
            ComponentKind::Mirror => "mirror",
            ComponentKind::Monitoring => "monitoring",
            ComponentKind::Tls => "tls",
            ComponentKind::Quay => "quay",
            ComponentKind::ClairPostgres => "clairpostgres",
        }
    }

    /// Human name used as the prefix of condition messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentKind::Base => "Base",
            ComponentKind::Postgres => "Postgres",
            ComponentKind::Clair => "Clair",
            ComponentKind::Redis => "Redis",
            ComponentKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            ComponentKind::ObjectStorage => "ObjectStorage",
            ComponentKind::Route => "Route",
            ComponentKind::Mirror => "Mirror",
            ComponentKind::Monitoring => "Monitoring",
            ComponentKind::Tls => "TLS",
            ComponentKind::Quay => "Quay",
            ComponentKind::ClairPostgres => "ClairPostgres",
        }
    }

    /// Readiness condition type reported for this component.
    pub fn condition_type(&self) -> ConditionType {
        match self {
            ComponentKind::Base => ConditionType::ComponentBaseReady,
            ComponentKind::Postgres => ConditionType::ComponentPostgresReady,
            ComponentKind::Clair => ConditionType::ComponentClairReady,
            ComponentKind::Redis => ConditionType::ComponentRedisReady,
            ComponentKind::HorizontalPodAutoscaler => ConditionType::ComponentHpaReady,
            ComponentKind::ObjectStorage => ConditionType::ComponentObjectStorageReady,
            ComponentKind::Route => ConditionType::ComponentRouteReady,
            ComponentKind::Mirror => ConditionType::ComponentMirrorReady,
            ComponentKind::Monitoring => ConditionType::ComponentMonitoringReady,
            ComponentKind::Tls => ConditionType::ComponentTlsReady,
            ComponentKind::Quay => ConditionType::ComponentQuayReady,
            ComponentKind::ClairPostgres => ConditionType::ComponentClairPostgresReady,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown component kind: {}", s))
    }
}

impl Condition {
    /// `{True, ComponentUnmanaged}` for a component the operator leaves alone.
    pub fn unmanaged(kind: ComponentKind) -> Self {
        Condition::new(
            kind.condition_type(),
            ConditionStatus::True,
            ConditionReason::ComponentUnmanaged,
            format!("{} not managed by the operator", kind.display_name()),
        )
    }
}

/// Operator-declared deviations from default component behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    /// Explicit replica count; `Some(0)` means the component was scaled down on purpose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub kind: ComponentKind,
    pub managed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Override>,
}

impl Component {
    pub fn managed(kind: ComponentKind) -> Self { Self { kind, managed: true, overrides: None } }
    pub fn unmanaged(kind: ComponentKind) -> Self { Self { kind, managed: false, overrides: None } }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.overrides.get_or_insert_with(Override::default).replicas = Some(replicas);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuayRegistrySpec {
    #[serde(default)]
    pub components: Vec<Component>,
}

/// Parent registry as seen by the checkers: identity plus desired state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuayRegistry {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    pub spec: QuayRegistrySpec,
}

impl QuayRegistry {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, uid: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: namespace.into(), uid: uid.into(), spec: QuayRegistrySpec::default() }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.spec.components.push(component);
        self
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.spec.components.iter().find(|c| c.kind == kind)
    }

    /// A kind missing from the component list counts as unmanaged.
    pub fn is_managed(&self, kind: ComponentKind) -> bool {
        self.component(kind).map(|c| c.managed).unwrap_or(false)
    }

    pub fn replicas_override(&self, kind: ComponentKind) -> Option<i32> {
        self.component(kind).and_then(|c| c.overrides.as_ref()).and_then(|o| o.replicas)
    }

    /// Name of a resource the operator derives from this registry, e.g. `registry-quay-mirror`.
    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.name, suffix)
    }

    /// Owner reference the operator stamps on every resource it creates for this registry.
    pub fn owner_ref(&self) -> OwnerRef {
        OwnerRef {
            api_version: API_VERSION.to_string(),
            kind: REGISTRY_KIND.to_string(),
            name: self.name.clone(),
            uid: self.uid.clone(),
        }
    }

    /// True when at least one owner reference on `res` points back at this registry instance.
    pub fn owns(&self, res: &ManagedResource) -> bool {
        let expected = self.owner_ref();
        res.owner_references.iter().any(|r| *r == expected)
    }
}

pub mod prelude {
    pub use super::{
        Component, ComponentKind, Condition, ConditionReason, ConditionStatus, ConditionType, ManagedResource,
        Override, OwnerRef, QuayRegistry, QuayRegistrySpec, RegistryStatus, ResourceCondition,
    };
}
