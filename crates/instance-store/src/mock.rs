//! Mock InstanceStore for unit testing
//!
//! This module provides an in-memory implementation of `InstanceStoreTrait`
//! that can be used in unit tests without a running Kubernetes API server.

use crate::error::StoreError;
use crate::store_trait::InstanceStoreTrait;
use crds::{OpenClawInstance, OpenClawInstanceStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock instance store for testing
///
/// Resources are kept in insertion order, which is the order `list` returns
/// them in. Failures can be injected per operation and fire once.
#[derive(Clone, Debug)]
pub struct MockInstanceStore {
    namespace: String,
    instances: Arc<Mutex<Vec<OpenClawInstance>>>,
    calls: Arc<Mutex<usize>>,
    create_failure: Arc<Mutex<Option<String>>>,
    list_failure: Arc<Mutex<Option<String>>>,
    delete_failures: Arc<Mutex<HashMap<String, StoreError>>>,
}

impl MockInstanceStore {
    /// Create a new, empty mock store for `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            instances: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(0)),
            create_failure: Arc::new(Mutex::new(None)),
            list_failure: Arc::new(Mutex::new(None)),
            delete_failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a resource directly (for test setup; not counted as a call)
    pub fn add_instance(&self, instance: OpenClawInstance) {
        self.instances.lock().unwrap().push(instance);
    }

    /// Snapshot of all stored resources, in insertion order
    pub fn instances(&self) -> Vec<OpenClawInstance> {
        self.instances.lock().unwrap().clone()
    }

    /// Simulate the operator reporting `phase` for the named resource
    pub fn set_phase(&self, name: &str, phase: &str) {
        let mut instances = self.instances.lock().unwrap();
        if let Some(instance) = instances
            .iter_mut()
            .find(|i| i.metadata.name.as_deref() == Some(name))
        {
            instance.status = Some(OpenClawInstanceStatus {
                phase: Some(phase.to_string()),
            });
        }
    }

    /// Number of store operations performed through the trait
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Make the next `create` fail with `message`
    pub fn fail_next_create(&self, message: impl Into<String>) {
        *self.create_failure.lock().unwrap() = Some(message.into());
    }

    /// Make the next `list` fail with `message`
    pub fn fail_next_list(&self, message: impl Into<String>) {
        *self.list_failure.lock().unwrap() = Some(message.into());
    }

    /// Make the next `delete` of `name` fail with `error`, leaving it stored
    pub fn fail_delete_of(&self, name: impl Into<String>, error: StoreError) {
        self.delete_failures.lock().unwrap().insert(name.into(), error);
    }

    fn record_call(&self) {
        *self.calls.lock().unwrap() += 1;
    }
}

/// Parse a `key=value[,key=value]` equality selector
fn parse_selector(selector: &str) -> Vec<(&str, &str)> {
    selector
        .split(',')
        .filter(|term| !term.trim().is_empty())
        .filter_map(|term| term.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect()
}

fn matches_selector(instance: &OpenClawInstance, terms: &[(&str, &str)]) -> bool {
    terms.iter().all(|(key, value)| {
        instance
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(*key))
            .is_some_and(|v| v == value)
    })
}

#[async_trait::async_trait]
impl InstanceStoreTrait for MockInstanceStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create(&self, instance: &OpenClawInstance) -> Result<OpenClawInstance, StoreError> {
        self.record_call();
        if let Some(message) = self.create_failure.lock().unwrap().take() {
            return Err(StoreError::Api(message));
        }

        let mut instances = self.instances.lock().unwrap();
        let name = instance.metadata.name.clone().unwrap_or_default();
        if instances
            .iter()
            .any(|i| i.metadata.name.as_deref() == Some(name.as_str()))
        {
            return Err(StoreError::Api(format!(
                "openclawinstances \"{}\" already exists",
                name
            )));
        }

        let mut stored = instance.clone();
        if stored.metadata.namespace.is_none() {
            stored.metadata.namespace = Some(self.namespace.clone());
        }
        instances.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, label_selector: &str) -> Result<Vec<OpenClawInstance>, StoreError> {
        self.record_call();
        if let Some(message) = self.list_failure.lock().unwrap().take() {
            return Err(StoreError::Api(message));
        }

        let terms = parse_selector(label_selector);
        Ok(self
            .instances
            .lock()
            .unwrap()
            .iter()
            .filter(|i| matches_selector(i, &terms))
            .cloned()
            .collect())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.record_call();
        if let Some(error) = self.delete_failures.lock().unwrap().remove(name) {
            return Err(error);
        }

        let mut instances = self.instances.lock().unwrap();
        let before = instances.len();
        instances.retain(|i| i.metadata.name.as_deref() != Some(name));
        if instances.len() == before {
            return Err(StoreError::NotFound(format!("instance {}", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::OpenClawInstanceSpec;
    use std::collections::BTreeMap;

    fn labelled(name: &str, tenant: &str) -> OpenClawInstance {
        let mut instance = OpenClawInstance::new(name, OpenClawInstanceSpec::default());
        instance.metadata.labels = Some(BTreeMap::from([
            ("tenant".to_string(), tenant.to_string()),
            ("app".to_string(), "tenant-instance".to_string()),
        ]));
        instance
    }

    #[tokio::test]
    async fn test_list_filters_by_all_selector_terms() {
        let store = MockInstanceStore::new("tenants");
        store.add_instance(labelled("tenant-00000001", "a"));
        store.add_instance(labelled("tenant-00000002", "b"));
        store.add_instance(labelled("tenant-00000003", "a"));

        let found = store.list("tenant=a,app=tenant-instance").await.unwrap();
        let names: Vec<_> = found.iter().filter_map(|i| i.metadata.name.clone()).collect();
        assert_eq!(names, vec!["tenant-00000001", "tenant-00000003"]);
        assert!(store.list("tenant=c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let store = MockInstanceStore::new("tenants");
        let created = store.create(&labelled("tenant-00000001", "a")).await.unwrap();
        assert_eq!(created.metadata.namespace.as_deref(), Some("tenants"));

        let err = store.create(&labelled("tenant-00000001", "b")).await.unwrap_err();
        assert!(matches!(err, StoreError::Api(_)));
        assert_eq!(store.instances().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MockInstanceStore::new("tenants");
        let err = store.delete("tenant-00000001").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failures_fire_once() {
        let store = MockInstanceStore::new("tenants");
        store.fail_next_list("boom");
        assert!(store.list("tenant=a").await.is_err());
        assert!(store.list("tenant=a").await.is_ok());
        assert_eq!(store.call_count(), 2);
    }
}
