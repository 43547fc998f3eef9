//! Readiness conditions and the status list they are merged into.

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One readiness condition type per component kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConditionType {
    ComponentBaseReady,
    ComponentPostgresReady,
    ComponentClairReady,
    ComponentRedisReady,
    #[serde(rename = "ComponentHPAReady")]
    ComponentHpaReady,
    ComponentObjectStorageReady,
    ComponentRouteReady,
    ComponentMirrorReady,
    ComponentMonitoringReady,
    #[serde(rename = "ComponentTLSReady")]
    ComponentTlsReady,
    ComponentQuayReady,
    ComponentClairPostgresReady,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    /// Parse the Kubernetes string form (`"True"`, `"False"`, `"Unknown"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "True" => Some(ConditionStatus::True),
            "False" => Some(ConditionStatus::False),
            "Unknown" => Some(ConditionStatus::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConditionReason {
    ComponentReady,
    ComponentNotReady,
    ComponentUnmanaged,
}

impl ConditionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionReason::ComponentReady => "ComponentReady",
            ConditionReason::ComponentNotReady => "ComponentNotReady",
            ConditionReason::ComponentUnmanaged => "ComponentUnmanaged",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    pub reason: ConditionReason,
    pub message: String,
    pub last_update_time: DateTime<Utc>,
    /// Only stamped once the condition is merged into a [`RegistryStatus`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    /// Build a condition stamped with the current time.
    pub fn new(type_: ConditionType, status: ConditionStatus, reason: ConditionReason, message: impl Into<String>) -> Self {
        Self { type_, status, reason, message: message.into(), last_update_time: Utc::now(), last_transition_time: None }
    }

    /// Compare everything except the timestamps.
    pub fn eq_ignoring_time(&self, other: &Condition) -> bool {
        self.type_ == other.type_ && self.status == other.status && self.reason == other.reason && self.message == other.message
    }
}

/// Conditions keyed by type; at most one entry per type, insertion order preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    #[serde(default)]
    conditions: Vec<Condition>,
}

impl RegistryStatus {
    pub fn new() -> Self { Self::default() }

    pub fn conditions(&self) -> &[Condition] { &self.conditions }

    pub fn get(&self, type_: ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Insert `cond`, replacing any prior condition of the same type in place.
    ///
    /// The stored `last_update_time` never moves backwards. The prior
    /// `last_transition_time` survives when the status did not change.
    pub fn upsert(&mut self, mut cond: Condition) {
        match self.conditions.iter_mut().find(|c| c.type_ == cond.type_) {
            Some(prev) => {
                if cond.last_update_time < prev.last_update_time {
                    cond.last_update_time = prev.last_update_time;
                }
                cond.last_transition_time = match prev.last_transition_time {
                    Some(t) if cond.status == prev.status => Some(t),
                    _ => Some(cond.last_update_time),
                };
                *prev = cond;
            }
            None => {
                cond.last_transition_time = Some(cond.last_update_time);
                self.conditions.push(cond);
            }
        }
    }

    pub fn remove(&mut self, type_: ConditionType) -> Option<Condition> {
        let idx = self.conditions.iter().position(|c| c.type_ == type_)?;
        Some(self.conditions.remove(idx))
    }

    pub fn len(&self) -> usize { self.conditions.len() }
    pub fn is_empty(&self) -> bool { self.conditions.is_empty() }
}
