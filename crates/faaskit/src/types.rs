//! Wire types for the FaaS control-plane API.
//!
//! These mirror the JSON bodies exchanged with the API one-to-one. Optional
//! request fields are skipped when unset so the server applies its own
//! defaults; response collections are `Option` because the API sends `null`
//! for empty maps and lists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle status reported for a function.
///
/// The API reports `Deploying` while a rollout is in progress, `Running` once
/// the function serves traffic and `Failed` when the rollout cannot proceed.
/// Anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FunctionStatus {
    /// Rollout in progress.
    Deploying,
    /// Serving traffic.
    Running,
    /// Rollout failed; no further progress without a new change.
    Failed,
    /// A status this client does not know about.
    Other(String),
}

impl FunctionStatus {
    /// The status string as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Deploying => "Deploying",
            Self::Running => "Running",
            Self::Failed => "Failed",
            Self::Other(s) => s,
        }
    }

    /// Whether the status is a terminal failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl From<String> for FunctionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Deploying" => Self::Deploying,
            "Running" => Self::Running,
            "Failed" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for FunctionStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<FunctionStatus> for String {
    fn from(status: FunctionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for FunctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource settings of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub memory_mb: u32,
    pub timeout_seconds: u32,
    pub replicas: u32,
    pub hardware_type: String,
}

/// Body of `POST functions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCreateRequest {
    pub name: String,
    pub runtime: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub handler_function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_inline: Option<String>,
    /// Base64-encoded zip archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_archive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FunctionConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A function as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub runtime: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub handler_function: String,
    #[serde(default)]
    pub invoke_url: String,
    pub status: FunctionStatus,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub config: Option<FunctionConfig>,
    #[serde(default)]
    pub environment: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub secrets: Option<Vec<String>>,
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub annotations: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub invocation_count: i64,
}

/// Body of `PUT functions/{id}/code`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCodeUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_inline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_archive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub handler_function: String,
}

/// Body of `PUT functions/{id}/config`.
///
/// Hardware type is fixed at creation and is not part of this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfigUpdateRequest {
    pub memory_mb: u32,
    pub timeout_seconds: u32,
    pub replicas: u32,
}

/// Body of `PUT functions/{id}/environment`.
///
/// Environment and secrets travel together because the server validates
/// secret bindings against the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEnvUpdateRequest {
    pub environment: BTreeMap<String, String>,
    pub secrets: Vec<String>,
}

/// Body of `PUT functions/{id}/metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadataUpdateRequest {
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// Response of `GET functions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionList {
    #[serde(default)]
    pub functions: Vec<FunctionResponse>,
    #[serde(default)]
    pub total: usize,
}

/// Body of `POST secrets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretCreateRequest {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A secret as reported by the API. The value is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub created_at: String,
}

/// A runtime from the platform catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub templates: Vec<String>,
    /// Supported hardware types (`cpu`, `gpu`).
    #[serde(default)]
    pub hardware: Vec<String>,
}

impl Runtime {
    /// Whether this runtime can run on the given hardware type.
    #[must_use]
    pub fn supports_hardware(&self, hardware: &str) -> bool {
        self.hardware.iter().any(|h| h == hardware)
    }
}

/// Response of `GET runtimes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeCatalog {
    #[serde(default)]
    pub runtimes: Vec<Runtime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_known_and_unknown_values() {
        assert_eq!(FunctionStatus::from("Running"), FunctionStatus::Running);
        assert_eq!(FunctionStatus::from("Deploying"), FunctionStatus::Deploying);
        assert!(FunctionStatus::from("Failed").is_failed());

        let other = FunctionStatus::from("Scaling");
        assert_eq!(other, FunctionStatus::Other("Scaling".to_string()));
        assert_eq!(other.to_string(), "Scaling");
    }

    #[test]
    fn test_create_request_skips_unset_fields() {
        let req = FunctionCreateRequest {
            name: "fn-basic".to_string(),
            runtime: "python3.11".to_string(),
            code_inline: Some("def handle(req): return 'ok'".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&req).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["name"], "fn-basic");
        assert!(obj.contains_key("code_inline"));
        assert!(!obj.contains_key("code_archive"));
        assert!(!obj.contains_key("config"));
        assert!(!obj.contains_key("environment"));
        assert!(!obj.contains_key("template"));
    }

    #[test]
    fn test_response_accepts_null_collections() {
        let body = r#"{
            "id": "f-1",
            "name": "fn-basic",
            "namespace": "default",
            "runtime": "python3.11",
            "status": "Deploying",
            "config": null,
            "environment": null,
            "secrets": null,
            "labels": {"team": "platform"},
            "annotations": null
        }"#;

        let resp: FunctionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.status, FunctionStatus::Deploying);
        assert!(resp.config.is_none());
        assert!(resp.environment.is_none());
        assert_eq!(resp.labels.unwrap()["team"], "platform");
        assert_eq!(resp.invocation_count, 0);
    }

    #[test]
    fn test_config_update_request_has_no_hardware() {
        let req = FunctionConfigUpdateRequest {
            memory_mb: 256,
            timeout_seconds: 30,
            replicas: 1,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("hardware_type").is_none());
        assert_eq!(json["memory_mb"], 256);
    }

    #[test]
    fn test_runtime_supports_hardware() {
        let rt = Runtime {
            name: "pytorch2.1.2".to_string(),
            version: "2.1.2".to_string(),
            templates: vec!["http".to_string()],
            hardware: vec!["gpu".to_string()],
        };
        assert!(rt.supports_hardware("gpu"));
        assert!(!rt.supports_hardware("cpu"));
    }
}
