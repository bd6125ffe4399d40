//! OpenClawInstance CRD
//!
//! Declares a single tenant workload. The OpenClaw operator converges each
//! resource into a deployment, ingress and TLS certificate, and reports its
//! progress in `status.phase`.
//!
//! Every nested section defaults when absent so that resources defaulted or
//! extended by the operator still deserialize.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "openclaw.rocks",
    version = "v1alpha1",
    kind = "OpenClawInstance",
    plural = "openclawinstances",
    namespaced,
    status = "OpenClawInstanceStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenClawInstanceSpec {
    /// Container image to run
    pub image: ImageSpec,

    /// OpenClaw application configuration
    pub config: InstanceConfig,

    /// Environment variables injected into the workload, in declaration order
    pub env: Vec<EnvVar>,

    /// Ingress exposure
    pub networking: NetworkingSpec,

    /// Network isolation
    pub security: SecuritySpec,

    /// Compute requests and limits
    pub resources: ResourceRequirements,

    /// Persistent storage
    pub storage: StorageSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageSpec {
    pub repository: String,
    pub tag: String,
    pub pull_policy: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pull_secrets: Vec<LocalObjectReference>,
}

/// Reference to an object in the same namespace, by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalObjectReference {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct InstanceConfig {
    /// Raw `openclaw.json` content, passed through by the operator
    pub raw: RawConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawConfig {
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Bind mode ("lan", "loopback")
    pub bind: String,
    pub mode: String,
    /// CIDRs whose forwarded headers are trusted
    pub trusted_proxies: Vec<String>,
    pub control_ui: ControlUiConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlUiConfig {
    pub allow_insecure_auth: bool,
    pub allowed_origins: Vec<String>,
}

/// A single `name=value` environment entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkingSpec {
    pub ingress: IngressSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressSpec {
    pub enabled: bool,
    pub class_name: String,
    pub annotations: BTreeMap<String, String>,
    pub hosts: Vec<IngressHost>,
    pub tls: Vec<IngressTls>,
    pub security: IngressSecurity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressHost {
    pub host: String,
    pub paths: Vec<IngressPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressPath {
    pub path: String,
    /// "Prefix", "Exact" or "ImplementationSpecific"
    pub path_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressTls {
    pub hosts: Vec<String>,
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IngressSecurity {
    #[serde(rename = "enableHSTS")]
    pub enable_hsts: bool,
    #[serde(rename = "forceHTTPS")]
    pub force_https: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SecuritySpec {
    pub network_policy: NetworkPolicySpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkPolicySpec {
    /// Namespaces allowed to reach the instance
    pub allowed_ingress_namespaces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRequirements {
    pub requests: ResourceQuantities,
    pub limits: ResourceQuantities,
}

/// Kubernetes quantity strings ("512Mi", "100m")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceQuantities {
    pub memory: String,
    pub cpu: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSpec {
    pub persistence: PersistenceSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistenceSpec {
    pub enabled: bool,
    pub size: String,
}

/// Observed state, written by the operator only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenClawInstanceStatus {
    /// Coarse lifecycle phase ("Pending", "Running", "Failed", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl OpenClawInstance {
    /// Phase reported by the operator, if any.
    pub fn phase(&self) -> Option<&str> {
        self.status.as_ref()?.phase.as_deref()
    }

    /// Value of the first declared env entry named `name`.
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.spec
            .env
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }
}
