//! Security compliance: per-VM posture checks.

use super::traits::{AgentReport, AgentTask, CloudAgent, SecurityCheck, SecurityFinding};
use crate::cloud::{CloudInventory, VirtualMachine};
use async_trait::async_trait;
use std::sync::Arc;

pub const CHECK_NSG: &str = "NSG configured";
pub const CHECK_DISK_ENCRYPTION: &str = "Disk encryption";
pub const CHECK_PATCHING: &str = "Patch compliance";

pub struct SecurityComplianceAgent {
    inventory: Arc<dyn CloudInventory>,
}

fn scan_vm(vm: VirtualMachine) -> SecurityFinding {
    let profile = &vm.security;
    let checks = [
        (CHECK_NSG, profile.nsg_configured),
        (CHECK_DISK_ENCRYPTION, profile.disk_encrypted),
        (CHECK_PATCHING, profile.patch_compliant),
    ]
    .into_iter()
    .map(|(name, passed)| SecurityCheck {
        name: name.to_string(),
        passed,
    })
    .collect();

    SecurityFinding {
        vm: vm.name,
        checks,
    }
}

impl SecurityComplianceAgent {
    pub fn new(inventory: Arc<dyn CloudInventory>) -> Self {
        Self { inventory }
    }

    pub async fn check_security_posture(
        &self,
        resource_group: &str,
    ) -> anyhow::Result<Vec<SecurityFinding>> {
        tracing::info!(resource_group, "Scanning security posture");
        let vms = self.inventory.list_virtual_machines(resource_group).await?;
        let findings: Vec<SecurityFinding> = vms.into_iter().map(scan_vm).collect();
        let failing = findings.iter().filter(|f| !f.is_compliant()).count();
        tracing::debug!(resource_group, vms = findings.len(), failing, "Security scan complete");
        Ok(findings)
    }
}

#[async_trait]
impl CloudAgent for SecurityComplianceAgent {
    fn name(&self) -> &str {
        "security_compliance"
    }

    async fn execute(&self, task: &AgentTask<'_>) -> anyhow::Result<AgentReport> {
        let findings = self.check_security_posture(task.resource_group).await?;
        Ok(AgentReport::Security { findings })
    }
}
