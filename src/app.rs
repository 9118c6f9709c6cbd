//! Process-wide wiring: one model client, one cloud backend, one registry.

use crate::agent::{
    AgentRegistry, CloudAssessment, CostManagementAgent, Intent, Orchestrator, ProvisioningAgent,
    ResourceOptimizationAgent, SecurityComplianceAgent, SummaryLimits,
};
use crate::cloud::{create_backend, CloudBackend};
use crate::config::Config;
use crate::observability::DispatchMetrics;
use crate::providers::{self, Provider, ProviderOptions, RetryPolicy};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Owns every long-lived collaborator. Built once at startup.
pub struct AppContext {
    pub config: Config,
    pub model: Arc<dyn Provider>,
    pub backend: CloudBackend,
    pub registry: Arc<AgentRegistry>,
    pub orchestrator: Orchestrator,
    pub assessment: CloudAssessment,
    pub metrics: Option<Arc<DispatchMetrics>>,
}

impl AppContext {
    /// Build the provider named in `config` and wire everything to it.
    pub async fn from_config(config: Config) -> Result<Self> {
        let options = ProviderOptions {
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model_name().to_string(),
            temperature: config.default_temperature,
        };
        let provider = providers::create_provider(config.provider_name(), &options)
            .with_context(|| format!("Failed to create provider '{}'", config.provider_name()))?;

        Self::with_provider(config, Arc::from(provider)).await
    }

    /// Wire the application around an already-built model client.
    pub async fn with_provider(config: Config, model: Arc<dyn Provider>) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config.reliability);
        let backend = create_backend(&config.cloud, &config.config_dir).await?;

        let registry = Arc::new(
            AgentRegistry::builder()
                .register(
                    Intent::ResourceOptimization,
                    Arc::new(ResourceOptimizationAgent::new(backend.inventory.clone())),
                )
                .register(
                    Intent::CostManagement,
                    Arc::new(CostManagementAgent::new(backend.inventory.clone())),
                )
                .register(
                    Intent::SecurityCompliance,
                    Arc::new(SecurityComplianceAgent::new(backend.inventory.clone())),
                )
                .register(
                    Intent::Provisioning,
                    Arc::new(ProvisioningAgent::new(
                        model.clone(),
                        retry,
                        backend.provisioner.clone(),
                        &config.cloud.default_location,
                    )),
                )
                .build(),
        );

        let metrics = if config.observability.metrics {
            Some(Arc::new(DispatchMetrics::new()?))
        } else {
            None
        };

        let mut orchestrator = Orchestrator::new(model.clone(), retry, registry.clone())
            .with_default_resource_group(config.orchestrator.default_resource_group.clone())
            .with_limits(SummaryLimits {
                max_listed_items: config.orchestrator.max_listed_items,
                max_listed_findings: config.orchestrator.max_listed_findings,
            });
        if let Some(metrics) = &metrics {
            orchestrator = orchestrator.with_metrics(metrics.clone());
        }

        let assessment = CloudAssessment::new(backend.inventory.clone(), model.clone(), retry);

        tracing::debug!(
            provider = model.name(),
            model = model.model(),
            backend = config.cloud.backend.as_str(),
            agents = registry.len(),
            "Application context ready"
        );

        Ok(Self {
            config,
            model,
            backend,
            registry,
            orchestrator,
            assessment,
            metrics,
        })
    }

    /// Enable metrics after construction (used by `query --metrics`).
    pub fn enable_metrics(&mut self) -> Result<Arc<DispatchMetrics>> {
        if let Some(metrics) = &self.metrics {
            return Ok(metrics.clone());
        }
        let metrics = Arc::new(DispatchMetrics::new()?);
        let retry = RetryPolicy::from_config(&self.config.reliability);
        self.orchestrator = Orchestrator::new(self.model.clone(), retry, self.registry.clone())
            .with_default_resource_group(self.config.orchestrator.default_resource_group.clone())
            .with_limits(SummaryLimits {
                max_listed_items: self.config.orchestrator.max_listed_items,
                max_listed_findings: self.config.orchestrator.max_listed_findings,
            })
            .with_metrics(metrics.clone());
        self.metrics = Some(metrics.clone());
        Ok(metrics)
    }

    /// Resource group from the command line, else the configured default.
    pub fn resource_group<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit
            .map(str::trim)
            .filter(|rg| !rg.is_empty())
            .or(self.config.orchestrator.default_resource_group.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_support::{demo_snapshot, ScriptedProvider, DEMO_GROUP};
    use crate::agent::Query;
    use tempfile::TempDir;

    async fn context_in(tmp: &TempDir, configure: impl FnOnce(&mut Config)) -> AppContext {
        let snapshot = serde_json::to_string(&demo_snapshot()).unwrap();
        tokio::fs::write(tmp.path().join("inventory.json"), snapshot)
            .await
            .unwrap();

        let mut config = Config::default();
        config.config_dir = tmp.path().to_path_buf();
        config.config_path = tmp.path().join("config.toml");
        configure(&mut config);

        AppContext::with_provider(config, ScriptedProvider::replying(["PROVISIONING"]))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn registers_an_agent_for_every_intent() {
        let tmp = TempDir::new().unwrap();
        let app = context_in(&tmp, |_| {}).await;

        assert_eq!(app.registry.len(), Intent::PRIORITY.len());
        assert!(app.registry.missing().is_empty());
        assert!(app.metrics.is_none());
    }

    #[tokio::test]
    async fn default_resource_group_flows_into_dispatch() {
        let tmp = TempDir::new().unwrap();
        let app = context_in(&tmp, |c| {
            c.orchestrator.default_resource_group = Some(DEMO_GROUP.to_string());
            c.orchestrator.max_listed_items = 2;
        })
        .await;

        let response = app.orchestrator.process(&Query::new("costs")).await.unwrap();
        assert!(response.response.contains("...and 10 more"));
        assert_eq!(app.resource_group(None), Some(DEMO_GROUP));
        assert_eq!(app.resource_group(Some("rg-other")), Some("rg-other"));
        assert_eq!(app.resource_group(Some("  ")), Some(DEMO_GROUP));
    }

    #[tokio::test]
    async fn metrics_follow_config_or_late_enable() {
        let tmp = TempDir::new().unwrap();
        let app = context_in(&tmp, |c| c.observability.metrics = true).await;
        assert!(app.metrics.is_some());

        let tmp = TempDir::new().unwrap();
        let mut app = context_in(&tmp, |_| {}).await;
        let metrics = app.enable_metrics().unwrap();
        app.orchestrator
            .process(&Query::new("security").with_resource_group(DEMO_GROUP))
            .await
            .unwrap();
        assert!(metrics
            .render()
            .contains(r#"intent="security_compliance",outcome="ok""#));
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let mut config = Config::default();
        config.default_provider = Some("carrier-pigeon".to_string());
        let err = AppContext::from_config(config).await.err().unwrap();
        assert!(format!("{err:#}").contains("Unknown provider"));
    }
}
