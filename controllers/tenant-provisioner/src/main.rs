//! Tenant Provisioner
//!
//! HTTP service that gives each tenant one OpenClaw instance:
//! - POST   /tenants/{id}/instance: declare a new OpenClawInstance
//! - GET    /tenants/{id}/instance: report endpoint, status and gateway token
//! - DELETE /tenants/{id}/instance: remove the tenant's instances
//!
//! The OpenClaw operator reconciles the declared resources; this service only
//! writes, lists and deletes them.

mod api;
mod config;
mod error;
mod manager;
mod metrics;
mod naming;
mod server;
mod spec_builder;
#[cfg(test)]
mod test_utils;

use crate::api::AppState;
use crate::config::Config;
use crate::error::ProvisionerError;
use crate::manager::InstanceManager;
use crate::metrics::Metrics;
use crate::spec_builder::SpecBuilder;
use instance_store::default_sources;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ProvisionerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Configure rustls crypto provider before any TLS client is built
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting Tenant Provisioner");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace);
    info!("  Domain: {}", config.domain);
    info!("  Internal domain: {}", config.internal_domain);
    info!("  Store timeout: {:?}", config.store_timeout);
    info!(
        "  Provider credentials: {}",
        config
            .provider_credentials
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let builder = SpecBuilder::new(&config)?;

    let sources = default_sources(config.kubeconfig_base64.clone(), config.kubeconfig_path.clone());
    let store = instance_store::connect(&sources, &config.namespace, config.store_timeout).await?;

    let metrics = Metrics::new()
        .map_err(|e| ProvisionerError::InvalidConfig(format!("failed to register metrics: {}", e)))?;

    let manager = InstanceManager::new(Arc::new(store), builder);
    let app = api::router(AppState::new(Arc::new(manager), Arc::new(metrics)));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    server::serve(listener, app, server::shutdown_signal(), server::SHUTDOWN_GRACE).await?;

    info!("Tenant Provisioner stopped");
    Ok(())
}
