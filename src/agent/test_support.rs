//! Scripted doubles shared by the agent tests.

use crate::cloud::snapshot::{InventorySnapshot, SnapshotCloud};
use crate::cloud::CloudBackend;
use crate::providers::Provider;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A provider that replays a script of replies. The last entry repeats once
/// the script runs out.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying<const N: usize>(replies: [&str; N]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok((*r).to_string())).collect())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(vec![Err(message.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().push(prompt.to_string());
        let next = {
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("scripted provider has no replies")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

pub const DEMO_GROUP: &str = "rg-demo";

/// Twelve resources, three VMs (one deallocated, one fully compliant).
pub fn demo_snapshot() -> InventorySnapshot {
    let resources: Vec<serde_json::Value> = (1..=12)
        .map(|i| {
            serde_json::json!({
                "name": format!("res-{i:02}"),
                "type": "Microsoft.Storage/storageAccounts",
                "location": "eastus"
            })
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "resource_groups": {
            DEMO_GROUP: {
                "resources": resources,
                "virtual_machines": [
                    {
                        "name": "vm-web",
                        "size": "Standard_B2s",
                        "location": "eastus",
                        "security": {"nsg_configured": true, "disk_encrypted": true, "patch_compliant": true}
                    },
                    {
                        "name": "vm-batch",
                        "size": "Standard_D4s_v3",
                        "location": "eastus",
                        "power_state": "PowerState/deallocated",
                        "security": {"nsg_configured": true}
                    },
                    {
                        "name": "vm-legacy",
                        "size": "Standard_A2",
                        "location": "westus"
                    }
                ]
            },
            "rg-empty": {}
        }
    }))
    .expect("demo snapshot is valid")
}

pub fn demo_backend() -> CloudBackend {
    let cloud = Arc::new(SnapshotCloud::from_snapshot(demo_snapshot()));
    CloudBackend {
        inventory: cloud.clone(),
        provisioner: cloud,
    }
}
