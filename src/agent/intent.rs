//! The closed set of user intents and their keyword tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a user query is asking for. Every query maps to exactly one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ResourceOptimization,
    CostManagement,
    SecurityCompliance,
    Provisioning,
}

impl Intent {
    /// Keyword matching order. When a query hits keywords of several intents
    /// the first one in this list wins.
    pub const PRIORITY: [Intent; 4] = [
        Intent::ResourceOptimization,
        Intent::CostManagement,
        Intent::SecurityCompliance,
        Intent::Provisioning,
    ];

    /// Intent used when classification fails.
    pub const FALLBACK: Intent = Intent::CostManagement;

    /// Snake-case identifier, reported in `agents_used`.
    pub fn id(self) -> &'static str {
        match self {
            Self::ResourceOptimization => "resource_optimization",
            Self::CostManagement => "cost_management",
            Self::SecurityCompliance => "security_compliance",
            Self::Provisioning => "provisioning",
        }
    }

    /// Upper-case category name used in classification prompts and replies.
    pub fn category(self) -> &'static str {
        match self {
            Self::ResourceOptimization => "RESOURCE_OPTIMIZATION",
            Self::CostManagement => "COST_MANAGEMENT",
            Self::SecurityCompliance => "SECURITY_COMPLIANCE",
            Self::Provisioning => "PROVISIONING",
        }
    }

    /// Lower-case substrings that select this intent without a model call.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::ResourceOptimization => &[
                "idle",
                "utilization",
                "utilisation",
                "underutilized",
                "resize",
                "vm size",
                "deallocated",
                "optimize",
                "optimise",
                "rightsize",
            ],
            Self::CostManagement => &[
                "cost",
                "price",
                "pricing",
                "expensive",
                "spend",
                "list resources",
                "show resources",
                "invoice",
            ],
            Self::SecurityCompliance => &[
                "security",
                "secure",
                "firewall",
                "encryption",
                "encrypted",
                "nsg",
                "compliance",
                "compliant",
                "vulnerab",
                "patching",
                "patch compliance",
                "patch level",
            ],
            Self::Provisioning => &["provision", "create", "deploy", "spin up", "new vm"],
        }
    }

    /// One-line description shown in prompts and `cloudpilot intents`.
    pub fn description(self) -> &'static str {
        match self {
            Self::ResourceOptimization => "VM utilization, idle or oversized resources",
            Self::CostManagement => "resource costs, spending and billing",
            Self::SecurityCompliance => "security posture, encryption, network rules, patching",
            Self::Provisioning => "creating VMs, storage accounts or databases",
        }
    }

    /// Look up an intent by category name, case-insensitively.
    pub fn from_category(name: &str) -> Option<Self> {
        let normalized = name.trim().replace([' ', '-'], "_");
        Self::PRIORITY
            .into_iter()
            .find(|intent| intent.category().eq_ignore_ascii_case(&normalized))
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Intent {
    type Err = anyhow::Error;

    /// Accepts either the snake-case id or the category name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::PRIORITY
            .into_iter()
            .find(|intent| intent.id().eq_ignore_ascii_case(trimmed))
            .or_else(|| Self::from_category(trimmed))
            .ok_or_else(|| anyhow::anyhow!("Unknown intent: {trimmed}"))
    }
}
