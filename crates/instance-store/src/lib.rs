//! OpenClawInstance Store
//!
//! Access to the cluster resource store that holds `OpenClawInstance`
//! documents. The store is the system of record: nothing is cached locally.
//!
//! # Example
//!
//! ```no_run
//! use instance_store::{connect, default_sources, InstanceStoreTrait};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sources = default_sources(None, "/root/.kube/config".into());
//! let store = connect(&sources, "tenants", Duration::from_secs(10)).await?;
//!
//! let instances = store.list("tenant=3f2c8a10-5b7e-4c1d-9a2f-0e6d4b8c7a91").await?;
//! println!("found {} instances", instances.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Credential chain**: base64 kubeconfig bundle, in-cluster service account,
//!   then local kubeconfig file
//! - **Bounded round trips**: every store call has a timeout and no retries
//! - **Mock store** (`test-util`): in-memory store with label filtering,
//!   phase injection and failure injection

pub mod client;
pub mod credentials;
pub mod error;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{connect, KubeInstanceStore};
pub use credentials::{
    default_sources, resolve, CredentialSource, InClusterSource, KubeconfigBundleSource,
    KubeconfigFileSource,
};
pub use error::StoreError;
pub use store_trait::InstanceStoreTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockInstanceStore;
