//! Cluster credential resolution.
//!
//! Credentials are resolved once at startup from an ordered list of sources.
//! Each source either yields a client configuration, reports that it is not
//! available (so the next source is tried), or fails because it is present
//! but unusable. The first source that yields a configuration wins; running
//! out of sources is fatal.

use crate::error::StoreError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kube::Config;
use kube::config::{KubeConfigOptions, Kubeconfig};
use std::path::PathBuf;
use tracing::{debug, info};

/// A single way of obtaining cluster credentials
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync + std::fmt::Debug {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Resolve a client configuration.
    ///
    /// Returns `Ok(None)` when this source is not configured in the current
    /// environment.
    async fn resolve(&self) -> Result<Option<Config>, StoreError>;
}

/// Base64-encoded kubeconfig bundle (e.g. the value of `KUBECONFIG_BASE64`)
#[derive(Debug, Clone)]
pub struct KubeconfigBundleSource {
    encoded: Option<String>,
}

impl KubeconfigBundleSource {
    pub fn new(encoded: Option<String>) -> Self {
        Self { encoded }
    }
}

#[async_trait::async_trait]
impl CredentialSource for KubeconfigBundleSource {
    fn name(&self) -> &'static str {
        "kubeconfig-bundle"
    }

    async fn resolve(&self) -> Result<Option<Config>, StoreError> {
        let encoded = match self.encoded.as_deref().map(str::trim) {
            Some(encoded) if !encoded.is_empty() => encoded,
            _ => return Ok(None),
        };

        let bytes = STANDARD.decode(encoded).map_err(|e| {
            StoreError::Credentials(format!("failed to decode kubeconfig bundle: {}", e))
        })?;
        let yaml = std::str::from_utf8(&bytes).map_err(|e| {
            StoreError::Credentials(format!("kubeconfig bundle is not valid UTF-8: {}", e))
        })?;
        let kubeconfig: Kubeconfig = serde_yaml::from_str(yaml).map_err(|e| {
            StoreError::Credentials(format!("failed to parse kubeconfig bundle: {}", e))
        })?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                StoreError::Credentials(format!("failed to load kubeconfig bundle: {}", e))
            })?;
        Ok(Some(config))
    }
}

/// Mounted service-account credentials when running inside a cluster
#[derive(Debug, Clone, Default)]
pub struct InClusterSource;

#[async_trait::async_trait]
impl CredentialSource for InClusterSource {
    fn name(&self) -> &'static str {
        "in-cluster"
    }

    async fn resolve(&self) -> Result<Option<Config>, StoreError> {
        match Config::incluster() {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                debug!(error = %e, "In-cluster credentials not available");
                Ok(None)
            }
        }
    }
}

/// Kubeconfig file on local disk (local development fallback)
#[derive(Debug, Clone)]
pub struct KubeconfigFileSource {
    path: PathBuf,
}

impl KubeconfigFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl CredentialSource for KubeconfigFileSource {
    fn name(&self) -> &'static str {
        "kubeconfig-file"
    }

    async fn resolve(&self) -> Result<Option<Config>, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Kubeconfig file not found");
            return Ok(None);
        }

        let kubeconfig = Kubeconfig::read_from(&self.path).map_err(|e| {
            StoreError::Credentials(format!(
                "failed to read kubeconfig {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                StoreError::Credentials(format!(
                    "failed to load kubeconfig {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        Ok(Some(config))
    }
}

/// The production source order: bundle, in-cluster, local file.
pub fn default_sources(
    kubeconfig_base64: Option<String>,
    kubeconfig_path: PathBuf,
) -> Vec<Box<dyn CredentialSource>> {
    vec![
        Box::new(KubeconfigBundleSource::new(kubeconfig_base64)),
        Box::new(InClusterSource),
        Box::new(KubeconfigFileSource::new(kubeconfig_path)),
    ]
}

/// Try each source in order and return the first configuration found,
/// together with the name of the source that produced it.
pub async fn resolve(
    sources: &[Box<dyn CredentialSource>],
) -> Result<(Config, &'static str), StoreError> {
    for source in sources {
        if let Some(config) = source.resolve().await? {
            info!(source = source.name(), cluster = %config.cluster_url, "Resolved cluster credentials");
            return Ok((config, source.name()));
        }
        debug!(source = source.name(), "Credential source not available, trying next");
    }

    let tried: Vec<&str> = sources.iter().map(|s| s.name()).collect();
    Err(StoreError::Credentials(format!(
        "no cluster credentials available (tried: {})",
        tried.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: test
  cluster:
    server: https://127.0.0.1:6443
    insecure-skip-tls-verify: true
users:
- name: test
  user:
    token: test-token
contexts:
- name: test
  context:
    cluster: test
    user: test
    namespace: tenants
current-context: test
"#;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_bundle_absent_is_not_available() {
        assert!(KubeconfigBundleSource::new(None).resolve().await.unwrap().is_none());
        assert!(
            KubeconfigBundleSource::new(Some("  ".to_string()))
                .resolve()
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_bundle_decodes_kubeconfig() {
        let source = KubeconfigBundleSource::new(Some(STANDARD.encode(TEST_KUBECONFIG)));
        let config = source.resolve().await.unwrap().expect("bundle should resolve");
        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert_eq!(config.default_namespace, "tenants");
    }

    #[tokio::test]
    async fn test_malformed_bundle_is_fatal() {
        let source = KubeconfigBundleSource::new(Some("not base64!!".to_string()));
        let err = source.resolve().await.unwrap_err();
        assert!(matches!(err, StoreError::Credentials(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_available() {
        let source = KubeconfigFileSource::new(temp_path("missing-kubeconfig"));
        assert!(source.resolve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_source_reads_kubeconfig() {
        let path = temp_path("tenant-provisioner-kubeconfig");
        std::fs::write(&path, TEST_KUBECONFIG).unwrap();

        let config = KubeconfigFileSource::new(path.clone())
            .resolve()
            .await
            .unwrap()
            .expect("file should resolve");
        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_first_available_source_wins() {
        let sources: Vec<Box<dyn CredentialSource>> = vec![
            Box::new(KubeconfigBundleSource::new(None)),
            Box::new(KubeconfigBundleSource::new(Some(STANDARD.encode(TEST_KUBECONFIG)))),
            Box::new(KubeconfigFileSource::new(temp_path("never-read"))),
        ];
        let (_, source) = resolve(&sources).await.unwrap();
        assert_eq!(source, "kubeconfig-bundle");
    }

    #[tokio::test]
    async fn test_exhausted_sources_fail() {
        let sources: Vec<Box<dyn CredentialSource>> = vec![
            Box::new(KubeconfigBundleSource::new(None)),
            Box::new(KubeconfigFileSource::new(temp_path("also-missing"))),
        ];
        let err = resolve(&sources).await.unwrap_err();
        match err {
            StoreError::Credentials(msg) => {
                assert!(msg.contains("kubeconfig-bundle"));
                assert!(msg.contains("kubeconfig-file"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
