//! Types for compute API operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::VmConfig;

/// Identifies one virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRef {
    pub project: String,
    pub zone: String,
    pub instance: String,
}

/// Raised before any outbound call when identifiers are missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required parameter(s): {}", .missing.join(", "))]
pub struct MissingIdentifiers {
    pub missing: Vec<&'static str>,
}

impl InstanceRef {
    /// Build a reference, rejecting blank fields.
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        instance: impl Into<String>,
    ) -> Result<Self, MissingIdentifiers> {
        let project = project.into().trim().to_string();
        let zone = zone.into().trim().to_string();
        let instance = instance.into().trim().to_string();

        let missing: Vec<&'static str> = [
            ("project", &project),
            ("zone", &zone),
            ("instance", &instance),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(MissingIdentifiers { missing });
        }

        Ok(Self {
            project,
            zone,
            instance,
        })
    }

    /// Per-request overrides on top of configured defaults. Blank overrides
    /// fall back to the default.
    pub fn resolve(
        defaults: &VmConfig,
        project: Option<&str>,
        zone: Option<&str>,
        instance: Option<&str>,
    ) -> Result<Self, MissingIdentifiers> {
        fn pick<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
            match value.map(str::trim) {
                Some(v) if !v.is_empty() => v,
                _ => default,
            }
        }

        Self::new(
            pick(project, &defaults.project),
            pick(zone, &defaults.zone),
            pick(instance, &defaults.instance),
        )
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.zone, self.instance)
    }
}

/// Lifecycle status of an instance as reported by the compute API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Provisioning,
    Staging,
    Running,
    Stopping,
    Stopped,
    Suspending,
    Suspended,
    Repairing,
    Terminated,
    /// Anything the API reports that is not listed above, or nothing at all.
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Provisioning => "PROVISIONING",
            InstanceStatus::Staging => "STAGING",
            InstanceStatus::Running => "RUNNING",
            InstanceStatus::Stopping => "STOPPING",
            InstanceStatus::Stopped => "STOPPED",
            InstanceStatus::Suspending => "SUSPENDING",
            InstanceStatus::Suspended => "SUSPENDED",
            InstanceStatus::Repairing => "REPAIRING",
            InstanceStatus::Terminated => "TERMINATED",
            InstanceStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parse a raw status string; unrecognised values become `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PROVISIONING" => InstanceStatus::Provisioning,
            "STAGING" => InstanceStatus::Staging,
            "RUNNING" => InstanceStatus::Running,
            "STOPPING" => InstanceStatus::Stopping,
            "STOPPED" => InstanceStatus::Stopped,
            "SUSPENDING" => InstanceStatus::Suspending,
            "SUSPENDED" => InstanceStatus::Suspended,
            "REPAIRING" => InstanceStatus::Repairing,
            "TERMINATED" => InstanceStatus::Terminated,
            _ => InstanceStatus::Unknown,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statuses a caller may wait for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitTarget {
    #[default]
    Running,
    Terminated,
}

impl WaitTarget {
    pub fn status(&self) -> InstanceStatus {
        match self {
            WaitTarget::Running => InstanceStatus::Running,
            WaitTarget::Terminated => InstanceStatus::Terminated,
        }
    }
}

/// Long-running operation returned by start and stop.
///
/// Fields this service does not read are kept in `extra` and serialized back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Instance resource. Only name, zone and status are read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Full zone URL, e.g. ".../projects/p/zones/us-central1-a".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Instance {
    pub fn status(&self) -> InstanceStatus {
        self.status
            .as_deref()
            .map(InstanceStatus::parse)
            .unwrap_or(InstanceStatus::Unknown)
    }

    /// Reduce to the summary returned to callers, filling gaps from `target`.
    pub fn summarize(&self, target: &InstanceRef) -> InstanceSummary {
        let name = self
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| target.instance.clone());
        let zone = self
            .zone
            .as_deref()
            .map(short_zone)
            .filter(|z| !z.is_empty())
            .unwrap_or(target.zone.as_str())
            .to_string();

        InstanceSummary {
            name,
            zone,
            status: self.status(),
        }
    }
}

/// `{name, zone, status}` as returned by status and wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub name: String,
    pub zone: String,
    pub status: InstanceStatus,
}

/// Last path segment of a zone URL.
fn short_zone(zone: &str) -> &str {
    zone.trim_end_matches('/').rsplit('/').next().unwrap_or(zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vm_defaults() -> VmConfig {
        VmConfig {
            project: "default-project".to_string(),
            zone: "asia-northeast1-a".to_string(),
            instance: "comfy-vm".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_instance_ref_rejects_blank_fields() {
        let err = InstanceRef::new("p", "  ", "").unwrap_err();
        assert_eq!(err.missing, vec!["zone", "instance"]);
        assert_eq!(
            err.to_string(),
            "missing required parameter(s): zone, instance"
        );
    }

    #[test]
    fn test_resolve_uses_defaults() {
        let target = InstanceRef::resolve(&vm_defaults(), None, None, None).unwrap();
        assert_eq!(target.project, "default-project");
        assert_eq!(target.zone, "asia-northeast1-a");
        assert_eq!(target.instance, "comfy-vm");
    }

    #[test]
    fn test_resolve_overrides_win() {
        let target =
            InstanceRef::resolve(&vm_defaults(), Some("other"), None, Some(" gpu-vm ")).unwrap();
        assert_eq!(target.project, "other");
        assert_eq!(target.zone, "asia-northeast1-a");
        assert_eq!(target.instance, "gpu-vm");
    }

    #[test]
    fn test_resolve_blank_override_falls_back() {
        let target = InstanceRef::resolve(&vm_defaults(), Some(""), None, None).unwrap();
        assert_eq!(target.project, "default-project");
    }

    #[test]
    fn test_resolve_without_defaults_fails() {
        let err = InstanceRef::resolve(&VmConfig::default(), None, None, Some("vm")).unwrap_err();
        assert_eq!(err.missing, vec!["project", "zone"]);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(InstanceStatus::parse("RUNNING"), InstanceStatus::Running);
        assert_eq!(InstanceStatus::parse("terminated"), InstanceStatus::Terminated);
        assert_eq!(InstanceStatus::parse("SOMETHING_NEW"), InstanceStatus::Unknown);
        assert_eq!(InstanceStatus::parse(""), InstanceStatus::Unknown);
    }

    #[test]
    fn test_status_deserialize_unknown_variant() {
        let status: InstanceStatus = serde_json::from_value(json!("HIBERNATING")).unwrap();
        assert_eq!(status, InstanceStatus::Unknown);
        let status: InstanceStatus = serde_json::from_value(json!("STAGING")).unwrap();
        assert_eq!(status, InstanceStatus::Staging);
    }

    #[test]
    fn test_wait_target_rejects_other_statuses() {
        let target: WaitTarget = serde_json::from_value(json!("TERMINATED")).unwrap();
        assert_eq!(target.status(), InstanceStatus::Terminated);
        assert!(serde_json::from_value::<WaitTarget>(json!("STOPPING")).is_err());
    }

    #[test]
    fn test_operation_keeps_unknown_fields() {
        let raw = json!({
            "kind": "compute#operation",
            "id": "123456789",
            "name": "operation-1700000000000-abc",
            "operationType": "start",
            "status": "RUNNING",
            "progress": 0,
            "targetLink": "https://compute.googleapis.com/compute/v1/projects/p/zones/z/instances/vm",
            "selfLink": "https://compute.googleapis.com/compute/v1/projects/p/zones/z/operations/op",
            "user": "svc@p.iam.gserviceaccount.com"
        });

        let operation: Operation = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(operation.operation_type.as_deref(), Some("start"));
        assert_eq!(operation.progress, Some(0));
        assert_eq!(operation.extra["kind"], "compute#operation");

        let round_trip = serde_json::to_value(&operation).unwrap();
        assert_eq!(round_trip, raw);
    }

    #[test]
    fn test_instance_summary_shortens_zone() {
        let instance: Instance = serde_json::from_value(json!({
            "name": "comfy-vm",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/asia-northeast1-a",
            "status": "STOPPING",
            "machineType": "n1-standard-8"
        }))
        .unwrap();
        let target = InstanceRef::new("p", "asia-northeast1-a", "comfy-vm").unwrap();

        let summary = instance.summarize(&target);
        assert_eq!(summary.name, "comfy-vm");
        assert_eq!(summary.zone, "asia-northeast1-a");
        assert_eq!(summary.status, InstanceStatus::Stopping);
    }

    #[test]
    fn test_instance_summary_fills_missing_fields() {
        let instance = Instance::default();
        let target = InstanceRef::new("p", "us-central1-a", "vm").unwrap();

        let summary = instance.summarize(&target);
        assert_eq!(summary.name, "vm");
        assert_eq!(summary.zone, "us-central1-a");
        assert_eq!(summary.status, InstanceStatus::Unknown);
    }

    #[test]
    fn test_summary_serializes_status_uppercase() {
        let summary = InstanceSummary {
            name: "vm".to_string(),
            zone: "z".to_string(),
            status: InstanceStatus::Running,
        };
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({"name": "vm", "zone": "z", "status": "RUNNING"})
        );
    }
}
