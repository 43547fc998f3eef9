//! In-memory accessor seeded with Deployments, for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use quay_core::ManagedResource;
use tracing::debug;

use crate::{managed_from_deployment, AccessError, ResourceAccessor};

/// Keyed by `(namespace, name)`. Objects go through the same Deployment
/// conversion as the kube-backed accessor.
#[derive(Default)]
pub struct InMemoryAccessor {
    objects: RwLock<HashMap<(String, String), Deployment>>,
    failure: Option<String>,
    latency: Option<Duration>,
    lookups: AtomicUsize,
}

impl InMemoryAccessor {
    pub fn new() -> Self { Self::default() }

    /// Builder form of [`InMemoryAccessor::insert`].
    pub fn with(self, namespace: &str, dep: Deployment) -> Self {
        self.insert(namespace, dep);
        self
    }

    /// Every lookup fails with an infrastructure error carrying `msg`.
    pub fn failing(mut self, msg: impl Into<String>) -> Self {
        self.failure = Some(msg.into());
        self
    }

    /// Delay each lookup, to exercise deadlines and cancellation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, namespace: &str, dep: Deployment) {
        let name = dep.metadata.name.clone().unwrap_or_default();
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert((namespace.to_string(), name), dep);
    }

    pub fn remove(&self, namespace: &str, name: &str) -> Option<Deployment> {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.remove(&(namespace.to_string(), name.to_string()))
    }

    /// Number of `get` calls served so far.
    pub fn lookups(&self) -> usize { self.lookups.load(Ordering::SeqCst) }
}

#[async_trait::async_trait]
impl ResourceAccessor for InMemoryAccessor {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ManagedResource>, AccessError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(msg) = &self.failure {
            return Err(AccessError::Unavailable(msg.clone()));
        }
        let dep = {
            let objects = self.objects.read().map_err(|_| AccessError::Unavailable("object store poisoned".to_string()))?;
            objects.get(&(namespace.to_string(), name.to_string())).cloned()
        };
        debug!(ns = %namespace, name = %name, found = dep.is_some(), "in-memory lookup");
        dep.as_ref().map(managed_from_deployment).transpose()
    }
}
