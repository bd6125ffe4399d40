//! Test utilities for unit testing the provisioner
//!
//! This module provides helpers for creating test data and wiring a manager
//! to an in-memory store.

use crate::config::Config;
use crate::manager::InstanceManager;
use crate::naming::TenantId;
use crate::spec_builder::SpecBuilder;
use crds::{OpenClawInstance, OpenClawInstanceStatus};
use instance_store::MockInstanceStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Tenant id used across tests
pub const TEST_TENANT: &str = "3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a91";

/// Configuration with test domains and no provider credentials
pub fn test_config() -> Config {
    Config {
        namespace: "tenants".to_string(),
        domain: "example.com".to_string(),
        internal_domain: "internal.example.com".to_string(),
        port: 8080,
        store_timeout: Duration::from_secs(1),
        kubeconfig_base64: None,
        kubeconfig_path: PathBuf::from("/nonexistent/kubeconfig"),
        provider_credentials: Vec::new(),
    }
}

/// Manager backed by a fresh mock store; the store handle is returned for
/// setup and assertions
pub fn test_manager() -> (InstanceManager, MockInstanceStore) {
    let store = MockInstanceStore::new("tenants");
    let builder = SpecBuilder::new(&test_config()).expect("test config is valid");
    let manager = InstanceManager::new(Arc::new(store.clone()), builder);
    (manager, store)
}

/// Helper to create a stored OpenClawInstance for `tenant` with an optional phase
pub fn create_test_instance(name: &str, tenant: &str, phase: Option<&str>) -> OpenClawInstance {
    let builder = SpecBuilder::new(&test_config()).expect("test config is valid");
    let tenant = TenantId::parse(tenant).expect("valid test tenant");
    let mut instance = builder.build(&tenant, name, "test-token");
    instance.status = phase.map(|p| OpenClawInstanceStatus {
        phase: Some(p.to_string()),
    });
    instance
}
