//! Quay kubehub – read-only lookups of registries and the workloads they own.
//!
//! Checkers never talk to the API server directly; they go through a
//! [`ResourceAccessor`] handed to them explicitly, so tests can swap in
//! [`InMemoryAccessor`].

#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::Api,
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Client,
};
use metrics::counter;
use quay_core::{ConditionStatus, ManagedResource, OwnerRef, QuayRegistry, QuayRegistrySpec, ResourceCondition};
use std::time::Instant;
use tracing::debug;

mod memory;

pub use memory::InMemoryAccessor;

/// Infrastructure failures. "Not found" is not an error; see [`ResourceAccessor::get`].
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("kube api: {0}")]
    Kube(#[from] kube::Error),
    #[error("malformed resource {name}: {reason}")]
    Malformed { name: String, reason: String },
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Read-only lookup of managed workloads within a namespace.
#[async_trait::async_trait]
pub trait ResourceAccessor: Send + Sync {
    /// Fetch the named deployment. `Ok(None)` means it genuinely does not exist;
    /// transient failures surface as `Err`.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ManagedResource>, AccessError>;
}

/// Reduce a Deployment to the fields readiness checks inspect.
pub fn managed_from_deployment(dep: &Deployment) -> Result<ManagedResource, AccessError> {
    let name = dep.metadata.name.clone().ok_or_else(|| AccessError::Malformed {
        name: "<unnamed>".to_string(),
        reason: "missing metadata.name".to_string(),
    })?;
    let owner_references = dep
        .metadata
        .owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|r| OwnerRef { api_version: r.api_version.clone(), kind: r.kind.clone(), name: r.name.clone(), uid: r.uid.clone() })
        .collect();
    let status = dep.status.as_ref();
    let available_replicas = status.and_then(|s| s.available_replicas).unwrap_or(0);
    let mut conditions = Vec::new();
    for c in status.and_then(|s| s.conditions.as_deref()).unwrap_or_default() {
        let parsed = ConditionStatus::parse(&c.status).ok_or_else(|| AccessError::Malformed {
            name: name.clone(),
            reason: format!("condition {} has invalid status {:?}", c.type_, c.status),
        })?;
        conditions.push(ResourceCondition { type_: c.type_.clone(), status: parsed, message: c.message.clone().unwrap_or_default() });
    }
    Ok(ManagedResource { name, owner_references, available_replicas, conditions })
}

/// Accessor backed by the kube-rs client.
#[derive(Clone)]
pub struct KubeAccessor {
    client: Client,
}

impl KubeAccessor {
    pub fn new(client: Client) -> Self { Self { client } }

    /// Build from the ambient kubeconfig / in-cluster config.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await.context("building kube client")?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> Client { self.client.clone() }
}

#[async_trait::async_trait]
impl ResourceAccessor for KubeAccessor {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ManagedResource>, AccessError> {
        let t0 = Instant::now();
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let found = match api.get_opt(name).await {
            Ok(v) => v,
            Err(e) => {
                counter!("kube_lookups_total", 1, "outcome" => "error");
                return Err(e.into());
            }
        };
        debug!(ns = %namespace, name = %name, found = found.is_some(), took_ms = %t0.elapsed().as_millis(), "deployment lookup");
        match found {
            Some(dep) => {
                counter!("kube_lookups_total", 1, "outcome" => "found");
                managed_from_deployment(&dep).map(Some)
            }
            None => {
                counter!("kube_lookups_total", 1, "outcome" => "not_found");
                Ok(None)
            }
        }
    }
}

fn registry_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(quay_core::API_GROUP, "v1", quay_core::REGISTRY_KIND);
    ApiResource::from_gvk_with_plural(&gvk, "quayregistries")
}

/// Extract identity and spec from a dynamically typed QuayRegistry object.
pub fn registry_from_dynamic(obj: &DynamicObject) -> Result<QuayRegistry> {
    let name = obj.metadata.name.clone().ok_or_else(|| anyhow!("QuayRegistry missing metadata.name"))?;
    let namespace = obj.metadata.namespace.clone().ok_or_else(|| anyhow!("QuayRegistry {} missing metadata.namespace", name))?;
    let uid = obj.metadata.uid.clone().ok_or_else(|| anyhow!("QuayRegistry {} missing metadata.uid", name))?;
    let spec: QuayRegistrySpec = match obj.data.get("spec") {
        Some(v) => serde_json::from_value(v.clone()).with_context(|| format!("parsing spec of QuayRegistry {}", name))?,
        None => QuayRegistrySpec::default(),
    };
    Ok(QuayRegistry { name, namespace, uid, spec })
}

/// Read a QuayRegistry from the cluster.
pub async fn fetch_registry(client: Client, namespace: &str, name: &str) -> Result<QuayRegistry> {
    let ar = registry_resource();
    let api: Api<DynamicObject> = Api::namespaced_with(client, namespace, &ar);
    let obj = api.get(name).await.with_context(|| format!("fetching QuayRegistry {}/{}", namespace, name))?;
    registry_from_dynamic(&obj)
}
