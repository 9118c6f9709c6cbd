//! Cloud backend traits and the record types agents read from them.
//!
//! These traits are the boundary to the cloud management APIs. Agents only
//! ever hold `Arc<dyn CloudInventory>` / `Arc<dyn ResourceProvisioner>`, so a
//! real SDK-backed client and the in-process snapshot are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Power state reported for a stopped and released VM.
pub const POWER_STATE_DEALLOCATED: &str = "PowerState/deallocated";
pub const POWER_STATE_RUNNING: &str = "PowerState/running";

/// One resource in a resource group, as listed by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
}

/// Security-relevant configuration of a VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSecurityProfile {
    #[serde(default)]
    pub nsg_configured: bool,
    #[serde(default)]
    pub disk_encrypted: bool,
    #[serde(default)]
    pub patch_compliant: bool,
}

/// A virtual machine together with its instance-view power state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub name: String,
    pub size: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_power_state")]
    pub power_state: String,
    #[serde(default)]
    pub security: VmSecurityProfile,
}

fn default_power_state() -> String {
    POWER_STATE_RUNNING.to_string()
}

impl VirtualMachine {
    pub fn is_deallocated(&self) -> bool {
        self.power_state.eq_ignore_ascii_case(POWER_STATE_DEALLOCATED)
    }
}

/// Read access to resources in a resource group.
#[async_trait]
pub trait CloudInventory: Send + Sync {
    async fn list_resources(&self, resource_group: &str) -> anyhow::Result<Vec<ResourceRecord>>;

    async fn list_virtual_machines(
        &self,
        resource_group: &str,
    ) -> anyhow::Result<Vec<VirtualMachine>>;

    fn name(&self) -> &str;
}

/// Administrator credentials attached to a new VM or SQL server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSpec {
    pub name: String,
    pub location: String,
    pub size: String,
    pub os_type: String,
    pub distribution: String,
    pub admin: AdminCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSpec {
    pub name: String,
    pub location: String,
    pub redundancy: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSpec {
    pub server_name: String,
    pub database_name: String,
    pub location: String,
    pub sku: String,
    pub admin: AdminCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedVm {
    pub id: String,
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedStorage {
    pub id: String,
    pub primary_endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedSql {
    pub server_id: String,
    pub database_id: String,
    pub fully_qualified_domain_name: String,
}

/// Create operations used by the provisioning agent.
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    async fn create_virtual_machine(
        &self,
        resource_group: &str,
        spec: &VmSpec,
    ) -> anyhow::Result<ProvisionedVm>;

    async fn create_storage_account(
        &self,
        resource_group: &str,
        spec: &StorageSpec,
    ) -> anyhow::Result<ProvisionedStorage>;

    async fn create_sql_database(
        &self,
        resource_group: &str,
        spec: &SqlSpec,
    ) -> anyhow::Result<ProvisionedSql>;

    fn name(&self) -> &str;
}
