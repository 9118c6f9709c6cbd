pub mod assessment;
pub mod classifier;
pub mod cost;
pub mod intent;
pub mod optimization;
pub mod orchestrator;
pub mod provisioning;
pub mod registry;
pub mod security;
pub mod summary;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use assessment::{Assessment, AssessmentDecision, CloudAssessment};
pub use classifier::{Classification, ClassificationMethod, IntentClassifier};
pub use cost::CostManagementAgent;
pub use intent::Intent;
pub use optimization::ResourceOptimizationAgent;
pub use orchestrator::{DispatchError, Orchestrator, Query, QueryContext, QueryResponse};
pub use provisioning::ProvisioningAgent;
pub use registry::AgentRegistry;
pub use security::SecurityComplianceAgent;
pub use summary::{SummaryLimits, SummarySource};
pub use traits::{AgentReport, AgentTask, CloudAgent};
