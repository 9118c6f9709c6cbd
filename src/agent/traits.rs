//! Capability interface shared by every cloud agent.

use crate::cloud::ResourceRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Input handed to an agent for one request.
#[derive(Debug, Clone, Copy)]
pub struct AgentTask<'a> {
    /// Raw user query. Only the provisioning agent reads it.
    pub query: &'a str,
    /// Resource group the operation is scoped to.
    pub resource_group: &'a str,
}

/// One cloud-management capability, registered under an intent.
///
/// Implementations hold shared backend handles only; `execute` is called
/// concurrently from many requests through `&self`.
#[async_trait]
pub trait CloudAgent: Send + Sync {
    fn name(&self) -> &str;

    /// Run the agent's operations for `task` and return their structured result.
    async fn execute(&self, task: &AgentTask<'_>) -> anyhow::Result<AgentReport>;
}

/// Current VM size, one per VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationRecord {
    pub vm: String,
    pub current_size: String,
}

/// A resource that is allocated but not doing work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleResource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCheck {
    pub name: String,
    pub passed: bool,
}

/// Security checks run against one VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub vm: String,
    pub checks: Vec<SecurityCheck>,
}

impl SecurityFinding {
    pub fn failed_checks(&self) -> impl Iterator<Item = &SecurityCheck> {
        self.checks.iter().filter(|check| !check.passed)
    }

    pub fn is_compliant(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningStatus {
    Success,
    Failed,
}

/// Result of a provisioning request. Failures are captured here, not raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningOutcome {
    pub status: ProvisioningStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ProvisioningOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: ProvisioningStatus::Success,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ProvisioningStatus::Failed,
            message: message.into(),
            details: None,
        }
    }
}

/// Structured output of an agent. The orchestrator picks a summary strategy
/// from the variant alone.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReport {
    Costs {
        resources: Vec<ResourceRecord>,
    },
    Optimization {
        utilization: Vec<UtilizationRecord>,
        idle_vms: Vec<IdleResource>,
    },
    Security {
        findings: Vec<SecurityFinding>,
    },
    Provisioning(ProvisioningOutcome),
    /// Open-ended shape from a capability without a summary template.
    Custom(BTreeMap<String, Value>),
}

impl AgentReport {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Costs { .. } => "costs",
            Self::Optimization { .. } => "optimization",
            Self::Security { .. } => "security",
            Self::Provisioning(_) => "provisioning",
            Self::Custom(_) => "custom",
        }
    }

    /// Caller-facing data mapping.
    pub fn to_data(&self) -> BTreeMap<String, Value> {
        let mut data = BTreeMap::new();
        match self {
            Self::Costs { resources } => {
                data.insert("resources".to_string(), json!(resources));
            }
            Self::Optimization {
                utilization,
                idle_vms,
            } => {
                data.insert("utilization".to_string(), json!(utilization));
                data.insert("idle_vms".to_string(), json!(idle_vms));
            }
            Self::Security { findings } => {
                data.insert("security_scan".to_string(), json!(findings));
            }
            Self::Provisioning(outcome) => {
                data.insert("provisioning".to_string(), json!(outcome));
            }
            Self::Custom(map) => data.clone_from(map),
        }
        data
    }
}
