//! InstanceStoreTrait for mocking
//!
//! This trait abstracts the cluster store so the lifecycle manager can be unit
//! tested against an in-memory implementation. `KubeInstanceStore` is the
//! production implementation.

use crate::error::StoreError;
use crds::OpenClawInstance;

/// Namespaced store operations on `OpenClawInstance` resources
///
/// Every call is a single round trip; implementations never retry.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait InstanceStoreTrait: Send + Sync {
    /// Namespace this store operates in
    fn namespace(&self) -> &str;

    /// Create a resource. Fails if a resource with the same name exists.
    async fn create(&self, instance: &OpenClawInstance) -> Result<OpenClawInstance, StoreError>;

    /// List resources matching a label selector (`key=value[,key=value]`),
    /// in store order.
    async fn list(&self, label_selector: &str) -> Result<Vec<OpenClawInstance>, StoreError>;

    /// Delete a resource by name. Returns `StoreError::NotFound` if it is absent.
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}
