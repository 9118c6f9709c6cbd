//! Resource optimization: VM sizes and deallocated VMs.

use super::traits::{AgentReport, AgentTask, CloudAgent, IdleResource, UtilizationRecord};
use crate::cloud::CloudInventory;
use async_trait::async_trait;
use std::sync::Arc;

pub struct ResourceOptimizationAgent {
    inventory: Arc<dyn CloudInventory>,
}

impl ResourceOptimizationAgent {
    pub fn new(inventory: Arc<dyn CloudInventory>) -> Self {
        Self { inventory }
    }

    pub async fn analyze_vm_utilization(
        &self,
        resource_group: &str,
    ) -> anyhow::Result<Vec<UtilizationRecord>> {
        tracing::info!(resource_group, "Analyzing VM utilization");
        let vms = self.inventory.list_virtual_machines(resource_group).await?;
        Ok(vms
            .into_iter()
            .map(|vm| UtilizationRecord {
                vm: vm.name,
                current_size: vm.size,
            })
            .collect())
    }

    /// VMs whose power state is deallocated.
    pub async fn identify_idle_resources(
        &self,
        resource_group: &str,
    ) -> anyhow::Result<Vec<IdleResource>> {
        tracing::info!(resource_group, "Checking for idle resources");
        let vms = self.inventory.list_virtual_machines(resource_group).await?;
        Ok(vms
            .into_iter()
            .filter(|vm| vm.is_deallocated())
            .map(|vm| IdleResource {
                name: vm.name,
                kind: "VM".to_string(),
                status: "Deallocated".to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl CloudAgent for ResourceOptimizationAgent {
    fn name(&self) -> &str {
        "resource_optimization"
    }

    async fn execute(&self, task: &AgentTask<'_>) -> anyhow::Result<AgentReport> {
        let (utilization, idle_vms) = tokio::try_join!(
            self.analyze_vm_utilization(task.resource_group),
            self.identify_idle_resources(task.resource_group),
        )?;
        Ok(AgentReport::Optimization {
            utilization,
            idle_vms,
        })
    }
}
