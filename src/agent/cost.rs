//! Cost management: lists what is deployed in a resource group.

use super::traits::{AgentReport, AgentTask, CloudAgent};
use crate::cloud::{CloudInventory, ResourceRecord};
use async_trait::async_trait;
use std::sync::Arc;

pub struct CostManagementAgent {
    inventory: Arc<dyn CloudInventory>,
}

impl CostManagementAgent {
    pub fn new(inventory: Arc<dyn CloudInventory>) -> Self {
        Self { inventory }
    }

    /// Every resource in the group as `{name, type, location}`.
    pub async fn get_resource_costs(&self, resource_group: &str) -> anyhow::Result<Vec<ResourceRecord>> {
        tracing::info!(resource_group, "Retrieving cost data");
        self.inventory.list_resources(resource_group).await
    }
}

#[async_trait]
impl CloudAgent for CostManagementAgent {
    fn name(&self) -> &str {
        "cost_management"
    }

    async fn execute(&self, task: &AgentTask<'_>) -> anyhow::Result<AgentReport> {
        let resources = self.get_resource_costs(task.resource_group).await?;
        Ok(AgentReport::Costs { resources })
    }
}
