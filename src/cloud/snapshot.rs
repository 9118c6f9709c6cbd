//! In-process cloud backend backed by a JSON inventory snapshot.

use super::traits::{
    CloudInventory, ProvisionedSql, ProvisionedStorage, ProvisionedVm, ResourceProvisioner,
    ResourceRecord, SqlSpec, StorageSpec, VirtualMachine, VmSecurityProfile, VmSpec,
    POWER_STATE_RUNNING,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const SUBSCRIPTION_PLACEHOLDER: &str = "00000000-0000-0000-0000-000000000000";

/// On-disk inventory format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub resource_groups: HashMap<String, ResourceGroupSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceGroupSnapshot {
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub virtual_machines: Vec<VirtualMachine>,
}

/// Serves inventory reads from a snapshot and records created resources in memory.
pub struct SnapshotCloud {
    subscription_id: String,
    state: RwLock<InventorySnapshot>,
}

impl SnapshotCloud {
    pub fn from_snapshot(snapshot: InventorySnapshot) -> Self {
        Self {
            subscription_id: SUBSCRIPTION_PLACEHOLDER.to_string(),
            state: RwLock::new(snapshot),
        }
    }

    pub fn with_subscription(mut self, subscription_id: &str) -> Self {
        if !subscription_id.trim().is_empty() {
            self.subscription_id = subscription_id.trim().to_string();
        }
        self
    }

    /// Load a snapshot file. A missing file yields an empty inventory.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Inventory snapshot not found; starting with an empty inventory"
            );
            return Ok(Self::from_snapshot(InventorySnapshot::default()));
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read inventory snapshot {}", path.display()))?;
        let snapshot: InventorySnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse inventory snapshot {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            resource_groups = snapshot.resource_groups.len(),
            "Loaded inventory snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    fn with_group<T>(
        &self,
        resource_group: &str,
        read: impl FnOnce(&ResourceGroupSnapshot) -> T,
    ) -> Result<T> {
        let state = self.state.read();
        let group = state
            .resource_groups
            .get(resource_group)
            .ok_or_else(|| anyhow::anyhow!("Resource group '{resource_group}' could not be found"))?;
        Ok(read(group))
    }

    fn resource_id(&self, resource_group: &str, provider_type: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{resource_group}/providers/{provider_type}/{name}",
            self.subscription_id
        )
    }

    fn record(
        &self,
        resource_group: &str,
        resource: ResourceRecord,
        vm: Option<VirtualMachine>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let group = state
            .resource_groups
            .get_mut(resource_group)
            .ok_or_else(|| anyhow::anyhow!("Resource group '{resource_group}' could not be found"))?;

        if group.resources.iter().any(|r| r.name == resource.name && r.kind == resource.kind) {
            anyhow::bail!(
                "Resource '{}' of type {} already exists in '{resource_group}'",
                resource.name,
                resource.kind
            );
        }
        group.resources.push(resource);
        if let Some(vm) = vm {
            group.virtual_machines.push(vm);
        }
        Ok(())
    }
}

#[async_trait]
impl CloudInventory for SnapshotCloud {
    async fn list_resources(&self, resource_group: &str) -> Result<Vec<ResourceRecord>> {
        self.with_group(resource_group, |group| group.resources.clone())
    }

    async fn list_virtual_machines(&self, resource_group: &str) -> Result<Vec<VirtualMachine>> {
        self.with_group(resource_group, |group| group.virtual_machines.clone())
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}

#[async_trait]
impl ResourceProvisioner for SnapshotCloud {
    async fn create_virtual_machine(
        &self,
        resource_group: &str,
        spec: &VmSpec,
    ) -> Result<ProvisionedVm> {
        const VM_TYPE: &str = "Microsoft.Compute/virtualMachines";

        let vm = VirtualMachine {
            name: spec.name.clone(),
            size: spec.size.clone(),
            location: spec.location.clone(),
            power_state: POWER_STATE_RUNNING.to_string(),
            security: VmSecurityProfile {
                nsg_configured: true,
                disk_encrypted: false,
                patch_compliant: true,
            },
        };
        self.record(
            resource_group,
            ResourceRecord {
                name: spec.name.clone(),
                kind: VM_TYPE.to_string(),
                location: spec.location.clone(),
            },
            Some(vm),
        )?;

        tracing::info!(resource_group, vm = %spec.name, size = %spec.size, "Recorded new VM");
        Ok(ProvisionedVm {
            id: self.resource_id(resource_group, VM_TYPE, &spec.name),
            public_ip: None,
        })
    }

    async fn create_storage_account(
        &self,
        resource_group: &str,
        spec: &StorageSpec,
    ) -> Result<ProvisionedStorage> {
        const STORAGE_TYPE: &str = "Microsoft.Storage/storageAccounts";

        self.record(
            resource_group,
            ResourceRecord {
                name: spec.name.clone(),
                kind: STORAGE_TYPE.to_string(),
                location: spec.location.clone(),
            },
            None,
        )?;

        let primary_endpoints: BTreeMap<String, String> = ["blob", "queue", "table", "file"]
            .into_iter()
            .map(|service| {
                (
                    service.to_string(),
                    format!("https://{}.{service}.core.windows.net/", spec.name),
                )
            })
            .collect();

        tracing::info!(resource_group, account = %spec.name, "Recorded new storage account");
        Ok(ProvisionedStorage {
            id: self.resource_id(resource_group, STORAGE_TYPE, &spec.name),
            primary_endpoints,
        })
    }

    async fn create_sql_database(
        &self,
        resource_group: &str,
        spec: &SqlSpec,
    ) -> Result<ProvisionedSql> {
        const SERVER_TYPE: &str = "Microsoft.Sql/servers";

        self.record(
            resource_group,
            ResourceRecord {
                name: spec.server_name.clone(),
                kind: SERVER_TYPE.to_string(),
                location: spec.location.clone(),
            },
            None,
        )?;

        let server_id = self.resource_id(resource_group, SERVER_TYPE, &spec.server_name);
        let database_id = format!("{server_id}/databases/{}", spec.database_name);

        tracing::info!(
            resource_group,
            server = %spec.server_name,
            database = %spec.database_name,
            "Recorded new SQL database"
        );
        Ok(ProvisionedSql {
            server_id,
            database_id,
            fully_qualified_domain_name: format!(
                "{}.database.windows.net",
                spec.server_name
            ),
        })
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}
