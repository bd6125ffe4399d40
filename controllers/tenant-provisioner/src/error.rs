//! Provisioner error types.
//!
//! Absence of an instance is not an error: lookups return `Ok(None)`.

use instance_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the tenant provisioner
#[derive(Debug, Error)]
pub enum ProvisionerError {
    /// Tenant id is not a canonical UUID (client fault, never retried)
    #[error("invalid tenant ID {0:?}: must be a valid UUID")]
    InvalidTenantId(String),

    /// Cluster store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Multi-delete aborted after `deleted` resources were already removed
    #[error("failed to delete instance {name} after deleting {deleted}: {source}")]
    DeleteFailed {
        name: String,
        deleted: usize,
        #[source]
        source: StoreError,
    },

    /// Secure random source unavailable
    #[error("random source unavailable: {0}")]
    Entropy(String),

    /// Operation intentionally not supported
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Invalid configuration (startup only)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP listener failure (startup only)
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}
