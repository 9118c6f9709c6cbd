//! Intent → agent mapping, built once at startup.

use super::intent::Intent;
use super::traits::CloudAgent;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only map from intent to the agent that serves it.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<Intent, Arc<dyn CloudAgent>>,
}

impl AgentRegistry {
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::default()
    }

    pub fn get(&self, intent: Intent) -> Option<Arc<dyn CloudAgent>> {
        self.agents.get(&intent).cloned()
    }

    pub fn contains(&self, intent: Intent) -> bool {
        self.agents.contains_key(&intent)
    }

    /// Registered intents in priority order.
    pub fn intents(&self) -> Vec<Intent> {
        Intent::PRIORITY
            .into_iter()
            .filter(|intent| self.contains(*intent))
            .collect()
    }

    /// Intents with no registered agent.
    pub fn missing(&self) -> Vec<Intent> {
        Intent::PRIORITY
            .into_iter()
            .filter(|intent| !self.contains(*intent))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<(&str, &str)> = self
            .agents
            .iter()
            .map(|(intent, agent)| (intent.id(), agent.name()))
            .collect();
        entries.sort_unstable();
        f.debug_map().entries(entries).finish()
    }
}

#[derive(Default)]
pub struct AgentRegistryBuilder {
    agents: HashMap<Intent, Arc<dyn CloudAgent>>,
}

impl AgentRegistryBuilder {
    /// Register `agent` for `intent`, replacing any earlier registration.
    pub fn register(mut self, intent: Intent, agent: Arc<dyn CloudAgent>) -> Self {
        if let Some(previous) = self.agents.insert(intent, agent) {
            tracing::debug!(
                intent = intent.id(),
                replaced = previous.name(),
                "Replaced agent registration"
            );
        }
        self
    }

    pub fn build(self) -> AgentRegistry {
        AgentRegistry {
            agents: self.agents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::traits::{AgentReport, AgentTask};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct NamedAgent(&'static str);

    #[async_trait]
    impl CloudAgent for NamedAgent {
        fn name(&self) -> &str {
            self.0
        }

        async fn execute(&self, _task: &AgentTask<'_>) -> anyhow::Result<AgentReport> {
            Ok(AgentReport::Custom(BTreeMap::new()))
        }
    }

    #[test]
    fn lookup_by_intent() {
        let registry = AgentRegistry::builder()
            .register(Intent::CostManagement, Arc::new(NamedAgent("costs")))
            .register(Intent::Provisioning, Arc::new(NamedAgent("prov")))
            .build();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(Intent::CostManagement).unwrap().name(), "costs");
        assert!(registry.get(Intent::SecurityCompliance).is_none());
        assert_eq!(
            registry.intents(),
            vec![Intent::CostManagement, Intent::Provisioning]
        );
        assert_eq!(
            registry.missing(),
            vec![Intent::ResourceOptimization, Intent::SecurityCompliance]
        );
    }

    #[test]
    fn later_registration_wins() {
        let registry = AgentRegistry::builder()
            .register(Intent::CostManagement, Arc::new(NamedAgent("first")))
            .register(Intent::CostManagement, Arc::new(NamedAgent("second")))
            .build();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(Intent::CostManagement).unwrap().name(), "second");
    }

    #[test]
    fn debug_lists_sorted_entries() {
        let registry = AgentRegistry::builder()
            .register(Intent::SecurityCompliance, Arc::new(NamedAgent("sec")))
            .register(Intent::CostManagement, Arc::new(NamedAgent("costs")))
            .build();
        assert_eq!(
            format!("{registry:?}"),
            r#"{"cost_management": "costs", "security_compliance": "sec"}"#
        );
    }

    #[test]
    fn registered_agents_are_shared_not_cloned() {
        let agent: Arc<dyn CloudAgent> = Arc::new(NamedAgent("shared"));
        let registry = AgentRegistry::builder()
            .register(Intent::CostManagement, agent.clone())
            .build();
        let copy = registry.clone();

        let looked_up = copy.get(Intent::CostManagement).unwrap();
        assert!(Arc::ptr_eq(&agent, &looked_up));

        let task = AgentTask {
            query: "anything",
            resource_group: "rg",
        };
        let report = tokio_test::block_on(looked_up.execute(&task));
        tokio_test::assert_ok!(report);
    }

    #[test]
    fn empty_registry() {
        let registry = AgentRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.missing().len(), 4);
    }
}
