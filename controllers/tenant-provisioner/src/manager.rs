//! Instance lifecycle management.
//!
//! Tenant instances move through absent → starting → running | error, and
//! back to absent when deleted. No state is kept here: every operation lists
//! the tenant's resources by label and works from what the store returns.
//!
//! Creates do not check for an existing instance, so concurrent or repeated
//! creates can leave several resources for one tenant. Reads pick the
//! earliest-created match (name breaks ties) and deletes remove all of them.

use crate::error::ProvisionerError;
use crate::naming::{TenantId, generate_gateway_token, generate_instance_name};
use crate::spec_builder::{GATEWAY_TOKEN_ENV, SpecBuilder};
use crds::OpenClawInstance;
use instance_store::InstanceStoreTrait;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Phase reported by the operator once the workload is serving
const PHASE_RUNNING: &str = "Running";
/// Phase reported by the operator when the workload cannot be brought up
const PHASE_FAILED: &str = "Failed";

/// Caller-facing instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Declared, not yet reported running (also any unknown phase)
    Starting,
    Running,
    Error,
}

impl InstanceStatus {
    /// Project an operator phase into the caller-facing vocabulary.
    pub fn from_phase(phase: Option<&str>) -> Self {
        match phase {
            Some(PHASE_RUNNING) => InstanceStatus::Running,
            Some(PHASE_FAILED) => InstanceStatus::Error,
            _ => InstanceStatus::Starting,
        }
    }
}

/// Read-side view of a tenant instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub name: String,
    pub endpoint: String,
    pub status: InstanceStatus,
    /// Empty when the resource carries no token entry
    pub gateway_token: String,
}

/// Creates, reads and deletes tenant instances through the cluster store
pub struct InstanceManager {
    store: Arc<dyn InstanceStoreTrait>,
    builder: SpecBuilder,
}

impl std::fmt::Debug for InstanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceManager")
            .field("namespace", &self.store.namespace())
            .field("builder", &self.builder)
            .finish()
    }
}

impl InstanceManager {
    pub fn new(store: Arc<dyn InstanceStoreTrait>, builder: SpecBuilder) -> Self {
        Self { store, builder }
    }

    /// Provision a new instance for `tenant_id`.
    ///
    /// Uses `gateway_token` when it is present and not blank, otherwise
    /// generates one. The returned info always reports `Starting`.
    pub async fn create_instance(
        &self,
        tenant_id: &str,
        gateway_token: Option<&str>,
    ) -> Result<InstanceInfo, ProvisionerError> {
        let tenant = TenantId::parse(tenant_id)?;
        let name = generate_instance_name()?;
        let token = match gateway_token.filter(|t| !t.trim().is_empty()) {
            Some(token) => token.to_string(),
            None => generate_gateway_token()?,
        };

        let instance = self.builder.build(&tenant, &name, &token);
        if let Err(e) = self.store.create(&instance).await {
            error!(tenant = %tenant, instance = %name, error = %e, "Failed to create tenant instance");
            return Err(e.into());
        }

        info!(tenant = %tenant, instance = %name, "Created tenant instance");
        Ok(InstanceInfo {
            endpoint: self.builder.endpoint(&name),
            name,
            status: InstanceStatus::Starting,
            gateway_token: token,
        })
    }

    /// Current state of the tenant's instance, or `None` if it has none.
    pub async fn get_instance(
        &self,
        tenant_id: &str,
    ) -> Result<Option<InstanceInfo>, ProvisionerError> {
        let tenant = TenantId::parse(tenant_id)?;
        let instances = self.find_instances(&tenant).await?;

        let Some(instance) = instances.first() else {
            debug!(tenant = %tenant, "No instance found");
            return Ok(None);
        };
        if instances.len() > 1 {
            warn!(
                tenant = %tenant,
                count = instances.len(),
                using = %instance.name_any(),
                "Tenant has more than one instance"
            );
        }

        Ok(Some(self.project(instance)))
    }

    /// Delete every instance of the tenant.
    ///
    /// Already-deleted resources count as success. The first other failure
    /// aborts; resources deleted before it stay deleted.
    pub async fn delete_instance(&self, tenant_id: &str) -> Result<(), ProvisionerError> {
        let tenant = TenantId::parse(tenant_id)?;
        let instances = self.find_instances(&tenant).await?;

        let mut deleted = 0;
        for instance in &instances {
            let name = instance.name_any();
            match self.store.delete(&name).await {
                Ok(()) => {
                    info!(tenant = %tenant, instance = %name, "Deleted tenant instance");
                    deleted += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!(tenant = %tenant, instance = %name, "Instance already gone");
                }
                Err(e) => {
                    error!(tenant = %tenant, instance = %name, deleted, error = %e, "Failed to delete tenant instance");
                    return Err(ProvisionerError::DeleteFailed {
                        name,
                        deleted,
                        source: e,
                    });
                }
            }
        }

        Ok(())
    }

    /// The operator cannot scale an instance to zero, so stopping deletes it.
    pub async fn stop_instance(&self, tenant_id: &str) -> Result<(), ProvisionerError> {
        self.delete_instance(tenant_id).await
    }

    /// Always rejected: a stopped instance cannot be restarted in place.
    pub async fn start_instance(&self, tenant_id: &str) -> Result<(), ProvisionerError> {
        TenantId::parse(tenant_id)?;
        Err(ProvisionerError::UnsupportedOperation(
            "starting a stopped instance is not supported; create a new instance instead"
                .to_string(),
        ))
    }

    /// Tenant's instances, earliest-created first.
    async fn find_instances(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<OpenClawInstance>, ProvisionerError> {
        let mut instances = self.store.list(&tenant.label_selector()).await.map_err(|e| {
            error!(tenant = %tenant, error = %e, "Failed to list tenant instances");
            ProvisionerError::from(e)
        })?;
        sort_by_age(&mut instances);
        Ok(instances)
    }

    fn project(&self, instance: &OpenClawInstance) -> InstanceInfo {
        let name = instance.name_any();
        InstanceInfo {
            endpoint: self.builder.endpoint(&name),
            status: InstanceStatus::from_phase(instance.phase()),
            gateway_token: instance.env_value(GATEWAY_TOKEN_ENV).unwrap_or_default().to_string(),
            name,
        }
    }
}

/// Earliest creation timestamp first, then name.
fn sort_by_age(instances: &mut [OpenClawInstance]) {
    instances.sort_by(|a, b| {
        let a_created = a.metadata.creation_timestamp.as_ref().map(|t| t.0);
        let b_created = b.metadata.creation_timestamp.as_ref().map(|t| t.0);
        a_created
            .cmp(&b_created)
            .then_with(|| a.metadata.name.cmp(&b.metadata.name))
    });
}
