//! Observed state of a managed workload, reduced to what readiness checks read.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::ConditionStatus;

/// Type of the workload condition that signals availability.
pub const AVAILABLE: &str = "Available";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub message: String,
}

/// Snapshot of a deployment-like resource as returned by an accessor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResource {
    pub name: String,
    #[serde(default)]
    pub owner_references: Vec<OwnerRef>,
    #[serde(default)]
    pub available_replicas: i32,
    #[serde(default)]
    pub conditions: Vec<ResourceCondition>,
}

impl ManagedResource {
    pub fn condition(&self, type_: &str) -> Option<&ResourceCondition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub fn available_condition(&self) -> Option<&ResourceCondition> { self.condition(AVAILABLE) }
}
