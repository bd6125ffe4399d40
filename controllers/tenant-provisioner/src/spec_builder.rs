//! OpenClawInstance document construction.
//!
//! `SpecBuilder` turns a tenant id, an instance name and a gateway token into
//! the complete resource submitted to the cluster. Building is pure: no I/O,
//! no failure. Static configuration is validated once, in `SpecBuilder::new`.
//!
//! Sizing, image and ingress policy are fixed constants below and are not
//! caller-configurable.

use crate::config::Config;
use crate::error::ProvisionerError;
use crate::naming::{TenantId, endpoint_url, internal_host, public_host, tls_secret_name};
use crds::{
    ControlUiConfig, EnvVar, GatewayConfig, ImageSpec, IngressHost, IngressPath, IngressSecurity,
    IngressSpec, IngressTls, InstanceConfig, LocalObjectReference, NetworkPolicySpec,
    NetworkingSpec, OpenClawInstance, OpenClawInstanceSpec, PersistenceSpec, RawConfig,
    ResourceQuantities, ResourceRequirements, SecuritySpec, StorageSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Env key holding the gateway token
pub const GATEWAY_TOKEN_ENV: &str = "OPENCLAW_GATEWAY_TOKEN";
const NODE_ENV: &str = "NODE_ENV";
const NODE_ENV_PRODUCTION: &str = "production";

pub const TENANT_LABEL: &str = "tenant";
pub const APP_LABEL: &str = "app";
pub const APP_LABEL_VALUE: &str = "tenant-instance";

// Image
pub const IMAGE_REPOSITORY: &str = "ghcr.io/openclaw/openclaw";
pub const IMAGE_TAG: &str = "latest";
pub const IMAGE_PULL_POLICY: &str = "Always";
pub const IMAGE_PULL_SECRET: &str = "registry-wareit";

// Gateway
const GATEWAY_BIND: &str = "lan";
const GATEWAY_MODE: &str = "local";
pub const TRUSTED_PROXIES: &[&str] = &["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"];

// Compute and storage
pub const CPU_REQUEST: &str = "100m";
pub const MEMORY_REQUEST: &str = "512Mi";
pub const CPU_LIMIT: &str = "1000m";
pub const MEMORY_LIMIT: &str = "1536Mi";
pub const PERSISTENT_VOLUME_SIZE: &str = "1Gi";

// Ingress
pub const INGRESS_CLASS: &str = "nginx";
pub const CLUSTER_ISSUER: &str = "letsencrypt-prod";
pub const PROXY_BODY_SIZE: &str = "50m";
/// Seconds; long-lived websocket sessions go through the gateway
pub const PROXY_TIMEOUT_SECS: &str = "3600";
pub const INGRESS_CONTROLLER_NAMESPACE: &str = "ingress-nginx";

/// Builds `OpenClawInstance` documents for one namespace and domain pair
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    namespace: String,
    domain: String,
    internal_domain: String,
    provider_env: Vec<EnvVar>,
}

impl SpecBuilder {
    /// Validate static configuration. Errors here are fatal at startup.
    pub fn new(config: &Config) -> Result<Self, ProvisionerError> {
        for (field, value) in [
            ("namespace", &config.namespace),
            ("domain", &config.domain),
            ("internal domain", &config.internal_domain),
        ] {
            if value.trim().is_empty() {
                return Err(ProvisionerError::InvalidConfig(format!("{} must not be empty", field)));
            }
        }

        let provider_env = config
            .provider_credentials
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| EnvVar::new(name.as_str(), value.as_str()))
            .collect();

        Ok(Self {
            namespace: config.namespace.clone(),
            domain: config.domain.clone(),
            internal_domain: config.internal_domain.clone(),
            provider_env,
        })
    }

    /// Public URL of the named instance
    pub fn endpoint(&self, instance_name: &str) -> String {
        endpoint_url(instance_name, &self.domain)
    }

    /// Build the full resource for `instance_name`.
    pub fn build(
        &self,
        tenant: &TenantId,
        instance_name: &str,
        gateway_token: &str,
    ) -> OpenClawInstance {
        OpenClawInstance {
            metadata: ObjectMeta {
                name: Some(instance_name.to_string()),
                namespace: Some(self.namespace.clone()),
                labels: Some(BTreeMap::from([
                    (TENANT_LABEL.to_string(), tenant.as_str().to_string()),
                    (APP_LABEL.to_string(), APP_LABEL_VALUE.to_string()),
                ])),
                ..Default::default()
            },
            spec: OpenClawInstanceSpec {
                image: image(),
                config: self.gateway_config(),
                env: self.env(gateway_token),
                networking: NetworkingSpec {
                    ingress: self.ingress(instance_name),
                },
                security: SecuritySpec {
                    network_policy: NetworkPolicySpec {
                        allowed_ingress_namespaces: vec![INGRESS_CONTROLLER_NAMESPACE.to_string()],
                    },
                },
                resources: resources(),
                storage: StorageSpec {
                    persistence: PersistenceSpec {
                        enabled: true,
                        size: PERSISTENT_VOLUME_SIZE.to_string(),
                    },
                },
            },
            status: None,
        }
    }

    /// Token and production marker first, then provider credentials in
    /// allow-list order.
    fn env(&self, gateway_token: &str) -> Vec<EnvVar> {
        let mut env = Vec::with_capacity(2 + self.provider_env.len());
        env.push(EnvVar::new(GATEWAY_TOKEN_ENV, gateway_token));
        env.push(EnvVar::new(NODE_ENV, NODE_ENV_PRODUCTION));
        env.extend(self.provider_env.iter().cloned());
        env
    }

    fn gateway_config(&self) -> InstanceConfig {
        InstanceConfig {
            raw: RawConfig {
                gateway: GatewayConfig {
                    bind: GATEWAY_BIND.to_string(),
                    mode: GATEWAY_MODE.to_string(),
                    trusted_proxies: TRUSTED_PROXIES.iter().map(|s| s.to_string()).collect(),
                    control_ui: ControlUiConfig {
                        allow_insecure_auth: true,
                        allowed_origins: vec![format!("https://dashboard.{}", self.domain)],
                    },
                },
            },
        }
    }

    fn ingress(&self, instance_name: &str) -> IngressSpec {
        let public = public_host(instance_name, &self.domain);
        let internal = internal_host(instance_name, &self.internal_domain);

        IngressSpec {
            enabled: true,
            class_name: INGRESS_CLASS.to_string(),
            annotations: ingress_annotations(),
            hosts: vec![root_host(public.clone()), root_host(internal)],
            tls: vec![IngressTls {
                hosts: vec![public],
                secret_name: tls_secret_name(instance_name),
            }],
            security: IngressSecurity {
                enable_hsts: false,
                force_https: false,
            },
        }
    }
}

fn image() -> ImageSpec {
    ImageSpec {
        repository: IMAGE_REPOSITORY.to_string(),
        tag: IMAGE_TAG.to_string(),
        pull_policy: IMAGE_PULL_POLICY.to_string(),
        pull_secrets: vec![LocalObjectReference {
            name: IMAGE_PULL_SECRET.to_string(),
        }],
    }
}

fn resources() -> ResourceRequirements {
    ResourceRequirements {
        requests: ResourceQuantities {
            memory: MEMORY_REQUEST.to_string(),
            cpu: CPU_REQUEST.to_string(),
        },
        limits: ResourceQuantities {
            memory: MEMORY_LIMIT.to_string(),
            cpu: CPU_LIMIT.to_string(),
        },
    }
}

fn ingress_annotations() -> BTreeMap<String, String> {
    [
        ("cert-manager.io/cluster-issuer", CLUSTER_ISSUER),
        ("nginx.ingress.kubernetes.io/proxy-body-size", PROXY_BODY_SIZE),
        ("nginx.ingress.kubernetes.io/proxy-read-timeout", PROXY_TIMEOUT_SECS),
        ("nginx.ingress.kubernetes.io/proxy-send-timeout", PROXY_TIMEOUT_SECS),
        ("nginx.ingress.kubernetes.io/ssl-redirect", "false"),
        ("nginx.ingress.kubernetes.io/force-ssl-redirect", "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn root_host(host: String) -> IngressHost {
    IngressHost {
        host,
        paths: vec![IngressPath {
            path: "/".to_string(),
            path_type: "Prefix".to_string(),
        }],
    }
}
