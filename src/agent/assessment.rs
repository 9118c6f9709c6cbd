//! Whole-resource-group assessment.
//!
//! Runs every optimization, cost and security operation for one resource group
//! and asks the model for a JSON decision over the combined state. A failed or
//! malformed decision is replaced by [`AssessmentDecision::fallback`].

use super::cost::CostManagementAgent;
use super::optimization::ResourceOptimizationAgent;
use super::security::SecurityComplianceAgent;
use super::traits::{IdleResource, SecurityFinding, UtilizationRecord};
use crate::cloud::{CloudInventory, ResourceRecord};
use crate::providers::{call_with_retry, sanitize_api_error, Provider, RetryPolicy};
use crate::util::parse_json_object;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationState {
    pub utilization: Vec<UtilizationRecord>,
    pub idle_resources: Vec<IdleResource>,
}

/// Everything the agents know about one resource group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudState {
    pub resource_optimization: OptimizationState,
    pub cost_management: Vec<ResourceRecord>,
    pub security: Vec<SecurityFinding>,
}

/// The model's verdict. List entries are free-form (strings or objects).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentDecision {
    pub overall_risk: String,
    #[serde(default)]
    pub optimization_actions: Vec<Value>,
    #[serde(default)]
    pub cost_reduction_suggestions: Vec<Value>,
    #[serde(default)]
    pub security_improvements: Vec<Value>,
    #[serde(default)]
    pub confidence: String,
}

impl AssessmentDecision {
    pub fn fallback() -> Self {
        Self {
            overall_risk: "UNKNOWN".to_string(),
            optimization_actions: Vec::new(),
            cost_reduction_suggestions: Vec::new(),
            security_improvements: Vec::new(),
            confidence: "LOW (Fallback Mode)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub cloud_state: CloudState,
    pub ai_decision: AssessmentDecision,
    /// True when `ai_decision` is the fallback rather than a model answer.
    #[serde(skip)]
    pub fallback: bool,
}

pub fn assessment_prompt(state: &CloudState) -> anyhow::Result<String> {
    Ok(format!(
        "You are an autonomous cloud optimization assistant.\n\n\
         Return ONLY valid JSON with exactly these keys:\n\
         {{\n  \"overall_risk\": \"\",\n  \"optimization_actions\": [],\n  \
         \"cost_reduction_suggestions\": [],\n  \"security_improvements\": [],\n  \
         \"confidence\": \"\"\n}}\n\n\
         Cloud State:\n{}",
        serde_json::to_string_pretty(state)?
    ))
}

pub struct CloudAssessment {
    optimization: ResourceOptimizationAgent,
    cost: CostManagementAgent,
    security: SecurityComplianceAgent,
    model: Arc<dyn Provider>,
    retry: RetryPolicy,
}

impl CloudAssessment {
    pub fn new(inventory: Arc<dyn CloudInventory>, model: Arc<dyn Provider>, retry: RetryPolicy) -> Self {
        Self {
            optimization: ResourceOptimizationAgent::new(inventory.clone()),
            cost: CostManagementAgent::new(inventory.clone()),
            security: SecurityComplianceAgent::new(inventory),
            model,
            retry,
        }
    }

    /// Collect the cloud state. Inventory errors propagate.
    pub async fn collect_state(&self, resource_group: &str) -> anyhow::Result<CloudState> {
        let (utilization, idle_resources, cost_management, security) = tokio::try_join!(
            self.optimization.analyze_vm_utilization(resource_group),
            self.optimization.identify_idle_resources(resource_group),
            self.cost.get_resource_costs(resource_group),
            self.security.check_security_posture(resource_group),
        )?;

        Ok(CloudState {
            resource_optimization: OptimizationState {
                utilization,
                idle_resources,
            },
            cost_management,
            security,
        })
    }

    pub async fn assess(&self, resource_group: &str) -> anyhow::Result<Assessment> {
        let cloud_state = self.collect_state(resource_group).await?;

        let (ai_decision, fallback) = match self.request_decision(&cloud_state).await {
            Ok(decision) => (decision, false),
            Err(error) => {
                tracing::warn!(
                    resource_group,
                    error = %sanitize_api_error(&format!("{error:#}")),
                    "Assessment decision unavailable; using fallback"
                );
                (AssessmentDecision::fallback(), true)
            }
        };

        Ok(Assessment {
            cloud_state,
            ai_decision,
            fallback,
        })
    }

    async fn request_decision(&self, state: &CloudState) -> anyhow::Result<AssessmentDecision> {
        let prompt = assessment_prompt(state)?;
        let model = &self.model;
        let prompt = prompt.as_str();

        let reply = call_with_retry(&self.retry, || async move { model.complete(prompt).await }).await?;
        if reply.trim().is_empty() {
            anyhow::bail!("model returned an empty assessment");
        }
        parse_json_object(&reply)
    }
}
