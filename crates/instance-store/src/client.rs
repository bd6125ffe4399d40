//! Kubernetes-backed instance store.
//!
//! Wraps a namespaced `Api<OpenClawInstance>`. Every call is bounded by the
//! configured round-trip timeout and is attempted exactly once.

use crate::credentials::{self, CredentialSource};
use crate::error::StoreError;
use crate::store_trait::InstanceStoreTrait;
use crds::OpenClawInstance;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Config};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Connect timeout for the underlying HTTP client
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Production store talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeInstanceStore {
    api: Api<OpenClawInstance>,
    namespace: String,
    round_trip_timeout: Duration,
}

impl std::fmt::Debug for KubeInstanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeInstanceStore")
            .field("namespace", &self.namespace)
            .field("round_trip_timeout", &self.round_trip_timeout)
            .finish()
    }
}

impl KubeInstanceStore {
    /// Creates a store over an existing client.
    pub fn new(client: Client, namespace: impl Into<String>, round_trip_timeout: Duration) -> Self {
        let namespace = namespace.into();
        Self {
            api: Api::namespaced(client, &namespace),
            namespace,
            round_trip_timeout,
        }
    }

    /// Creates a store from a resolved client configuration.
    pub fn from_config(
        mut config: Config,
        namespace: impl Into<String>,
        round_trip_timeout: Duration,
    ) -> Result<Self, StoreError> {
        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(round_trip_timeout);
        let client = Client::try_from(config)?;
        Ok(Self::new(client, namespace, round_trip_timeout))
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.round_trip_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(format!(
                "{} did not complete within {:?}",
                operation, self.round_trip_timeout
            ))),
        }
    }
}

/// Resolves credentials from `sources` and builds a store for `namespace`.
pub async fn connect(
    sources: &[Box<dyn CredentialSource>],
    namespace: &str,
    round_trip_timeout: Duration,
) -> Result<KubeInstanceStore, StoreError> {
    let (config, _source) = credentials::resolve(sources).await?;
    KubeInstanceStore::from_config(config, namespace, round_trip_timeout)
}

#[async_trait::async_trait]
impl InstanceStoreTrait for KubeInstanceStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create(&self, instance: &OpenClawInstance) -> Result<OpenClawInstance, StoreError> {
        self.bounded("create", self.api.create(&PostParams::default(), instance))
            .await
    }

    async fn list(&self, label_selector: &str) -> Result<Vec<OpenClawInstance>, StoreError> {
        debug!(namespace = %self.namespace, selector = %label_selector, "Listing instances");
        let params = ListParams::default().labels(label_selector);
        let list = self.bounded("list", self.api.list(&params)).await?;
        Ok(list.items)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        match self
            .bounded("delete", self.api.delete(name, &DeleteParams::default()))
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::Kube(kube::Error::Api(ae))) if ae.code == 404 => {
                Err(StoreError::NotFound(format!("instance {}", name)))
            }
            Err(e) => Err(e),
        }
    }
}
