//! Instance store errors

use thiserror::Error;

/// Errors that can occur when talking to the cluster resource store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error (transport, permission, conflict, server error)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Target resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Round trip exceeded the configured store timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// No usable cluster credentials, or a credential source is malformed
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Store rejected the request for a reason not covered above
    #[error("Store API error: {0}")]
    Api(String),
}

impl StoreError {
    /// Whether the error reports a missing target resource
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Kube(kube::Error::Api(ae)) => ae.code == 404,
            _ => false,
        }
    }
}
