//! Runtime configuration.
//!
//! `Config::from_env` is the only place that reads the process environment.
//! Everything else receives the resulting `Config` (or values derived from
//! it) explicitly.

use crate::error::ProvisionerError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Provider credentials copied into every new instance, in injection order
pub const PROVIDER_CREDENTIAL_KEYS: &[&str] = &["ANTHROPIC_API_KEY", "OPENAI_API_KEY"];

const DEFAULT_NAMESPACE: &str = "tenants";
const DEFAULT_DOMAIN: &str = "wareit.ai";
const DEFAULT_INTERNAL_DOMAIN: &str = "internal.wareit.ai";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// All runtime configuration values
#[derive(Clone)]
pub struct Config {
    /// Namespace holding tenant instances
    pub namespace: String,
    /// Public domain suffix (instances are served at `<name>.<domain>`)
    pub domain: String,
    /// Internal domain suffix (`<name>.<internal_domain>`)
    pub internal_domain: String,
    /// HTTP listen port
    pub port: u16,
    /// Upper bound for a single cluster store round trip
    pub store_timeout: Duration,
    /// Base64-encoded kubeconfig bundle, if provided
    pub kubeconfig_base64: Option<String>,
    /// Local kubeconfig fallback path
    pub kubeconfig_path: PathBuf,
    /// Non-empty provider credentials, in `PROVIDER_CREDENTIAL_KEYS` order
    pub provider_credentials: Vec<(String, String)>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider_keys: Vec<&str> = self
            .provider_credentials
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        f.debug_struct("Config")
            .field("namespace", &self.namespace)
            .field("domain", &self.domain)
            .field("internal_domain", &self.internal_domain)
            .field("port", &self.port)
            .field("store_timeout", &self.store_timeout)
            .field("kubeconfig_base64", &self.kubeconfig_base64.as_ref().map(|_| "<redacted>"))
            .field("kubeconfig_path", &self.kubeconfig_path)
            .field("provider_credentials", &provider_keys)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ProvisionerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProvisionerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ProvisionerError::InvalidConfig(format!("PORT {:?} is not a valid port: {}", raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        let store_timeout_secs = match get("STORE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ProvisionerError::InvalidConfig(format!(
                    "STORE_TIMEOUT_SECS {:?} is not a number: {}",
                    raw, e
                ))
            })?,
            None => DEFAULT_STORE_TIMEOUT_SECS,
        };
        if store_timeout_secs == 0 {
            return Err(ProvisionerError::InvalidConfig(
                "STORE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let kubeconfig_path = match get("KUBECONFIG") {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(get("HOME").unwrap_or_default())
                .join(".kube")
                .join("config"),
        };

        let provider_credentials = PROVIDER_CREDENTIAL_KEYS
            .iter()
            .filter_map(|key| get(key).map(|value| (key.to_string(), value)))
            .collect();

        Ok(Self {
            namespace: get("TENANT_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            domain: get("TENANT_DOMAIN").unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            internal_domain: get("TENANT_INTERNAL_DOMAIN")
                .unwrap_or_else(|| DEFAULT_INTERNAL_DOMAIN.to_string()),
            port,
            store_timeout: Duration::from_secs(store_timeout_secs),
            kubeconfig_base64: get("KUBECONFIG_BASE64"),
            kubeconfig_path,
            provider_credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ProvisionerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("HOME", "/home/op")]).unwrap();
        assert_eq!(config.namespace, "tenants");
        assert_eq!(config.domain, "wareit.ai");
        assert_eq!(config.internal_domain, "internal.wareit.ai");
        assert_eq!(config.port, 8080);
        assert_eq!(config.store_timeout, Duration::from_secs(10));
        assert_eq!(config.kubeconfig_base64, None);
        assert_eq!(config.kubeconfig_path, PathBuf::from("/home/op/.kube/config"));
        assert!(config.provider_credentials.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TENANT_NAMESPACE", "claws"),
            ("TENANT_DOMAIN", "example.com"),
            ("TENANT_INTERNAL_DOMAIN", "example.internal"),
            ("PORT", "9090"),
            ("STORE_TIMEOUT_SECS", "3"),
            ("KUBECONFIG", "/etc/kube/config"),
            ("KUBECONFIG_BASE64", "YWJj"),
        ])
        .unwrap();
        assert_eq!(config.namespace, "claws");
        assert_eq!(config.domain, "example.com");
        assert_eq!(config.internal_domain, "example.internal");
        assert_eq!(config.port, 9090);
        assert_eq!(config.store_timeout, Duration::from_secs(3));
        assert_eq!(config.kubeconfig_path, PathBuf::from("/etc/kube/config"));
        assert_eq!(config.kubeconfig_base64.as_deref(), Some("YWJj"));
    }

    #[test]
    fn test_provider_credentials_follow_allow_list_order() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("UNRELATED_API_KEY", "ignored"),
        ])
        .unwrap();
        assert_eq!(
            config.provider_credentials,
            vec![
                ("ANTHROPIC_API_KEY".to_string(), "sk-ant".to_string()),
                ("OPENAI_API_KEY".to_string(), "sk-openai".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = load(&[("ANTHROPIC_API_KEY", ""), ("TENANT_DOMAIN", "  ")]).unwrap();
        assert!(config.provider_credentials.is_empty());
        assert_eq!(config.domain, "wareit.ai");
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(matches!(load(&[("PORT", "http")]), Err(ProvisionerError::InvalidConfig(_))));
        assert!(matches!(
            load(&[("STORE_TIMEOUT_SECS", "0")]),
            Err(ProvisionerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[("ANTHROPIC_API_KEY", "sk-secret"), ("KUBECONFIG_BASE64", "c2VjcmV0")])
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("c2VjcmV0"));
        assert!(rendered.contains("ANTHROPIC_API_KEY"));
    }
}
