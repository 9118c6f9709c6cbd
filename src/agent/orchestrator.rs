//! Query dispatch: classify, route to the registered agent, summarize.

use super::classifier::{Classification, ClassificationMethod, IntentClassifier};
use super::intent::Intent;
use super::registry::AgentRegistry;
use super::summary::{raw_data_summary, render_template, summary_prompt, SummaryLimits, SummarySource};
use super::traits::{AgentReport, AgentTask};
use crate::observability::runtime_trace;
use crate::observability::DispatchMetrics;
use crate::providers::{call_with_retry, sanitize_api_error, Provider, RetryPolicy};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Caller-supplied context for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryContext {
    pub resource_group: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl QueryContext {
    /// Flattened view used in summary prompts.
    fn entries(&self) -> BTreeMap<String, String> {
        let mut entries = self.extra.clone();
        if let Some(rg) = &self.resource_group {
            entries.insert("resource_group".to_string(), rg.clone());
        }
        entries
    }
}

/// One user request. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    context: QueryContext,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: QueryContext::default(),
        }
    }

    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.context.resource_group = Some(resource_group.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.extra.insert(key.into(), value.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }
}

/// Result of a dispatched query. Only `response`, `agents_used` and `data`
/// are part of the caller contract.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub response: String,
    pub agents_used: Vec<String>,
    pub data: BTreeMap<String, Value>,
    #[serde(skip)]
    pub classification: Classification,
    #[serde(skip)]
    pub summary_source: SummarySource,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no agent registered for intent {0}")]
    AgentNotRegistered(Intent),
    #[error("no resource group given for {intent} and no default configured")]
    MissingResourceScope { intent: Intent },
    #[error("{intent} agent failed: {source:#}")]
    Agent {
        intent: Intent,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AgentNotRegistered(_) => "agent_not_registered",
            Self::MissingResourceScope { .. } => "missing_resource_scope",
            Self::Agent { .. } => "agent_error",
        }
    }
}

/// Routes queries to agents. Shared across tasks through `&self`.
pub struct Orchestrator {
    classifier: IntentClassifier,
    registry: Arc<AgentRegistry>,
    model: Arc<dyn Provider>,
    retry: RetryPolicy,
    default_resource_group: Option<String>,
    limits: SummaryLimits,
    metrics: Option<Arc<DispatchMetrics>>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn Provider>, retry: RetryPolicy, registry: Arc<AgentRegistry>) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone(), retry),
            registry,
            model,
            retry,
            default_resource_group: None,
            limits: SummaryLimits::default(),
            metrics: None,
        }
    }

    pub fn with_default_resource_group(mut self, resource_group: Option<String>) -> Self {
        self.default_resource_group = resource_group.filter(|rg| !rg.trim().is_empty());
        self
    }

    pub fn with_limits(mut self, limits: SummaryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub async fn process(&self, query: &Query) -> Result<QueryResponse, DispatchError> {
        let started = Instant::now();
        let classification = self.classifier.classify(query.text()).await;
        let intent = classification.intent;

        if let Some(metrics) = &self.metrics {
            metrics.record_classification(intent.id(), classification.method.label());
        }
        runtime_trace::record_event(
            "classification",
            Some(intent.id()),
            Some(!matches!(
                classification.method,
                ClassificationMethod::Fallback { .. }
            )),
            None,
            json!({ "method": classification.method.label() }),
        );

        let result = self.dispatch(query, classification).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(error) => error.label(),
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(intent.id(), outcome, started.elapsed());
        }
        let message = result.as_ref().err().map(ToString::to_string);
        runtime_trace::record_event(
            "dispatch",
            Some(intent.id()),
            Some(result.is_ok()),
            message.as_deref(),
            json!({
                "outcome": outcome,
                "elapsed_ms": u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            }),
        );

        result
    }

    async fn dispatch(
        &self,
        query: &Query,
        classification: Classification,
    ) -> Result<QueryResponse, DispatchError> {
        let intent = classification.intent;
        let agent = self
            .registry
            .get(intent)
            .ok_or(DispatchError::AgentNotRegistered(intent))?;

        let resource_group = query
            .context()
            .resource_group
            .as_deref()
            .filter(|rg| !rg.trim().is_empty())
            .or(self.default_resource_group.as_deref())
            .ok_or(DispatchError::MissingResourceScope { intent })?;

        tracing::info!(
            intent = intent.id(),
            method = classification.method.label(),
            agent = agent.name(),
            resource_group,
            "Dispatching query"
        );

        let task = AgentTask {
            query: query.text(),
            resource_group,
        };
        let report = agent
            .execute(&task)
            .await
            .map_err(|source| DispatchError::Agent { intent, source })?;

        let data = report.to_data();
        let (response, summary_source) = self
            .summarize(query, intent, resource_group, &report, &data)
            .await;

        if let Some(metrics) = &self.metrics {
            metrics.record_summary(summary_source.label());
        }

        Ok(QueryResponse {
            response,
            agents_used: vec![intent.id().to_string()],
            data,
            classification,
            summary_source,
        })
    }

    async fn summarize(
        &self,
        query: &Query,
        intent: Intent,
        resource_group: &str,
        report: &AgentReport,
        data: &BTreeMap<String, Value>,
    ) -> (String, SummarySource) {
        if let Some(text) = render_template(report, resource_group, &self.limits) {
            return (text, SummarySource::Template);
        }

        let prompt = summary_prompt(query.text(), &query.context().entries(), intent, data);
        let model = &self.model;
        let prompt = prompt.as_str();

        match call_with_retry(&self.retry, || async move { model.complete(prompt).await }).await {
            Ok(text) if !text.trim().is_empty() => (text.trim().to_string(), SummarySource::Model),
            Ok(_) => {
                tracing::warn!(intent = intent.id(), "Model returned an empty summary");
                runtime_trace::record_event(
                    "summary",
                    Some(intent.id()),
                    Some(false),
                    Some("empty reply"),
                    json!({ "report": report.kind() }),
                );
                (raw_data_summary(data), SummarySource::RawData)
            }
            Err(error) => {
                let message = sanitize_api_error(&format!("{error:#}"));
                tracing::warn!(intent = intent.id(), error = %message, "Summary generation failed");
                runtime_trace::record_event(
                    "summary",
                    Some(intent.id()),
                    Some(false),
                    Some(&message),
                    json!({ "report": report.kind() }),
                );
                (raw_data_summary(data), SummarySource::RawData)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::classifier::ClassificationMethod;
    use crate::agent::cost::CostManagementAgent;
    use crate::agent::optimization::ResourceOptimizationAgent;
    use crate::agent::security::SecurityComplianceAgent;
    use crate::agent::test_support::{demo_backend, ScriptedProvider, DEMO_GROUP};
    use crate::agent::traits::{CloudAgent, ProvisioningOutcome};
    use async_trait::async_trait;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(5))
    }

    fn demo_registry() -> Arc<AgentRegistry> {
        let backend = demo_backend();
        Arc::new(
            AgentRegistry::builder()
                .register(
                    Intent::CostManagement,
                    Arc::new(CostManagementAgent::new(backend.inventory.clone())),
                )
                .register(
                    Intent::ResourceOptimization,
                    Arc::new(ResourceOptimizationAgent::new(backend.inventory.clone())),
                )
                .register(
                    Intent::SecurityCompliance,
                    Arc::new(SecurityComplianceAgent::new(backend.inventory)),
                )
                .build(),
        )
    }

    fn orchestrator(provider: &Arc<ScriptedProvider>, registry: Arc<AgentRegistry>) -> Orchestrator {
        Orchestrator::new(provider.clone(), fast_retry(), registry)
    }

    struct FixedAgent(AgentReport);

    #[async_trait]
    impl CloudAgent for FixedAgent {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn execute(&self, _task: &AgentTask<'_>) -> anyhow::Result<AgentReport> {
            Ok(self.0.clone())
        }
    }

    struct BrokenAgent;

    #[async_trait]
    impl CloudAgent for BrokenAgent {
        fn name(&self) -> &str {
            "broken"
        }

        async fn execute(&self, task: &AgentTask<'_>) -> anyhow::Result<AgentReport> {
            anyhow::bail!("backend unavailable for {}", task.resource_group)
        }
    }

    #[tokio::test]
    async fn keyword_query_never_calls_model() {
        let provider = ScriptedProvider::replying(["unused"]);
        let orch = orchestrator(&provider, demo_registry());

        let response = orch
            .process(&Query::new("Show me the cost of my resources").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 0);
        assert_eq!(response.agents_used, vec!["cost_management"]);
        assert_eq!(response.summary_source, SummarySource::Template);
        assert!(matches!(
            response.classification.method,
            ClassificationMethod::Keyword { keyword: "cost" }
        ));
        assert!(response.response.starts_with("Found 12 resources in rg-demo:"));
    }

    #[tokio::test]
    async fn priority_picks_optimization_over_cost() {
        let provider = ScriptedProvider::replying(["unused"]);
        let orch = orchestrator(&provider, demo_registry());

        let response = orch
            .process(&Query::new("What do idle VMs cost me?").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();

        assert_eq!(response.agents_used, vec!["resource_optimization"]);
        assert!(response.data.contains_key("utilization"));
        assert!(response.data.contains_key("idle_vms"));
        assert!(response.response.contains("Idle/deallocated VMs: 1"));
        assert!(response.response.contains("- vm-batch"));
    }

    #[tokio::test]
    async fn unmatched_query_uses_exactly_one_model_call() {
        let provider = ScriptedProvider::replying(["SECURITY_COMPLIANCE"]);
        let orch = orchestrator(&provider, demo_registry());

        let response = orch
            .process(&Query::new("are my machines locked down?").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(response.agents_used, vec!["security_compliance"]);
        assert!(response.data.contains_key("security_scan"));
        assert!(response.response.contains("(1 fully compliant)"));
    }

    #[tokio::test]
    async fn billing_question_is_classified_by_model_and_answered_from_costs() {
        let provider = ScriptedProvider::replying(["COST_MANAGEMENT"]);
        let orch = orchestrator(&provider, demo_registry());

        let response = orch
            .process(&Query::new("what's my bill").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(response.agents_used, vec!["cost_management"]);
        assert!(matches!(
            response.classification.method,
            ClassificationMethod::Model { .. }
        ));
        assert_eq!(response.data["resources"].as_array().unwrap().len(), 12);
        assert_eq!(response.summary_source, SummarySource::Template);
        assert!(response.response.starts_with("Found 12 resources in rg-demo:"));
    }

    #[tokio::test]
    async fn unparseable_classification_falls_back_to_costs() {
        let provider = ScriptedProvider::replying(["no idea"]);
        let orch = orchestrator(&provider, demo_registry());

        let response = orch
            .process(&Query::new("hello there").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();

        assert_eq!(response.agents_used, vec!["cost_management"]);
        assert!(matches!(
            response.classification.method,
            ClassificationMethod::Fallback { .. }
        ));
    }

    #[tokio::test]
    async fn missing_agent_is_an_error() {
        let provider = ScriptedProvider::replying(["unused"]);
        let orch = orchestrator(&provider, demo_registry());

        let err = orch
            .process(&Query::new("provision a new vm").with_resource_group(DEMO_GROUP))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::AgentNotRegistered(Intent::Provisioning)));
        assert_eq!(err.label(), "agent_not_registered");
    }

    #[tokio::test]
    async fn agent_failure_propagates_with_intent() {
        let provider = ScriptedProvider::replying(["unused"]);
        let registry = Arc::new(
            AgentRegistry::builder()
                .register(Intent::CostManagement, Arc::new(BrokenAgent))
                .build(),
        );
        let orch = orchestrator(&provider, registry);

        let err = orch
            .process(&Query::new("show spend").with_resource_group("rg-x"))
            .await
            .unwrap_err();

        match err {
            DispatchError::Agent { intent, source } => {
                assert_eq!(intent, Intent::CostManagement);
                assert!(source.to_string().contains("rg-x"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_resource_group_surfaces_agent_error() {
        let provider = ScriptedProvider::replying(["unused"]);
        let orch = orchestrator(&provider, demo_registry());

        let err = orch
            .process(&Query::new("list costs").with_resource_group("rg-missing"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("could not be found"));
    }

    #[tokio::test]
    async fn default_resource_group_applies_when_context_has_none() {
        let provider = ScriptedProvider::replying(["unused"]);
        let orch = orchestrator(&provider, demo_registry())
            .with_default_resource_group(Some(DEMO_GROUP.to_string()));

        let response = orch.process(&Query::new("cost report")).await.unwrap();
        assert!(response.response.contains(DEMO_GROUP));

        let bare = orchestrator(&provider, demo_registry());
        let err = bare.process(&Query::new("cost report")).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MissingResourceScope { intent: Intent::CostManagement }
        ));
    }

    #[tokio::test]
    async fn cost_summary_truncates_after_limit() {
        let provider = ScriptedProvider::replying(["unused"]);
        let orch = orchestrator(&provider, demo_registry());

        let response = orch
            .process(&Query::new("cost").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();

        assert_eq!(response.response.matches("\n- ").count(), 10);
        assert!(response.response.ends_with("...and 2 more"));
        assert_eq!(response.data["resources"].as_array().unwrap().len(), 12);

        let narrow = orchestrator(&provider, demo_registry()).with_limits(SummaryLimits {
            max_listed_items: 3,
            max_listed_findings: 1,
        });
        let response = narrow
            .process(&Query::new("cost").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();
        assert!(response.response.ends_with("...and 9 more"));
    }

    #[tokio::test]
    async fn open_ended_report_is_summarized_by_model() {
        let provider = ScriptedProvider::replying(["Your VM is ready."]);
        let registry = Arc::new(
            AgentRegistry::builder()
                .register(
                    Intent::Provisioning,
                    Arc::new(FixedAgent(AgentReport::Provisioning(ProvisioningOutcome::success(
                        "VM vm-1 created",
                        json!({"vm_name": "vm-1"}),
                    )))),
                )
                .build(),
        );
        let orch = orchestrator(&provider, registry);

        let response = orch
            .process(
                &Query::new("deploy a web server")
                    .with_resource_group("rg-prov")
                    .with_context("env", "staging"),
            )
            .await
            .unwrap();

        assert_eq!(response.response, "Your VM is ready.");
        assert_eq!(response.summary_source, SummarySource::Model);
        assert_eq!(response.data["provisioning"]["status"], "success");

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("User query: deploy a web server"));
        assert!(prompt.contains("env=staging"));
        assert!(prompt.contains("resource_group=rg-prov"));
        assert!(prompt.contains("PROVISIONING"));
    }

    #[tokio::test]
    async fn summary_failure_falls_back_to_raw_data() {
        let provider = ScriptedProvider::failing("model offline");
        let mut custom = BTreeMap::new();
        custom.insert("answer".to_string(), json!(42));
        let registry = Arc::new(
            AgentRegistry::builder()
                .register(Intent::Provisioning, Arc::new(FixedAgent(AgentReport::Custom(custom))))
                .build(),
        );
        let orch = orchestrator(&provider, registry);

        let response = orch
            .process(&Query::new("provision something").with_resource_group("rg"))
            .await
            .unwrap();

        assert_eq!(response.summary_source, SummarySource::RawData);
        assert!(response.response.starts_with("Summary unavailable; raw results follow."));
        assert!(response.response.contains("\"answer\": 42"));
    }

    #[tokio::test]
    async fn metrics_count_dispatch_outcomes() {
        let provider = ScriptedProvider::replying(["unused"]);
        let metrics = Arc::new(DispatchMetrics::new().unwrap());
        let orch = orchestrator(&provider, demo_registry()).with_metrics(metrics.clone());

        orch.process(&Query::new("cost").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();
        let _ = orch.process(&Query::new("create a vm").with_resource_group(DEMO_GROUP)).await;

        let text = metrics.render();
        assert!(text.contains(r#"cloudpilot_dispatches_total{intent="cost_management",outcome="ok"} 1"#));
        assert!(text.contains(
            r#"cloudpilot_dispatches_total{intent="provisioning",outcome="agent_not_registered"} 1"#
        ));
        assert!(text.contains(r#"cloudpilot_summaries_total{source="template"} 1"#));
    }

    #[test]
    fn response_serializes_caller_contract_only() {
        let response = QueryResponse {
            response: "ok".into(),
            agents_used: vec!["cost_management".into()],
            data: BTreeMap::new(),
            classification: Classification {
                intent: Intent::CostManagement,
                method: ClassificationMethod::Keyword { keyword: "cost" },
            },
            summary_source: SummarySource::Template,
        };
        let value = serde_json::to_value(&response).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["agents_used", "data", "response"]);
    }

    #[tokio::test]
    async fn concurrent_queries_share_one_orchestrator() {
        let provider = ScriptedProvider::replying(["unused"]);
        let orch = Arc::new(orchestrator(&provider, demo_registry()));

        let handles: Vec<_> = ["cost", "idle vms", "security scan"]
            .into_iter()
            .map(|text| {
                let orch = orch.clone();
                tokio::spawn(async move {
                    orch.process(&Query::new(text).with_resource_group(DEMO_GROUP))
                        .await
                        .map(|r| r.agents_used)
                })
            })
            .collect();

        let mut used = Vec::new();
        for handle in handles {
            used.extend(handle.await.unwrap().unwrap());
        }
        used.sort();
        assert_eq!(
            used,
            vec!["cost_management", "resource_optimization", "security_compliance"]
        );
    }
}
