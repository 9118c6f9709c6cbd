//! User-facing summaries for agent reports.
//!
//! Known report shapes render through fixed templates. Open-ended shapes go to
//! the model with [`summary_prompt`]; if that fails the caller falls back to
//! [`raw_data_summary`].

use super::intent::Intent;
use super::traits::AgentReport;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

/// How many records a template lists before collapsing the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    pub max_listed_items: usize,
    pub max_listed_findings: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            max_listed_items: 10,
            max_listed_findings: 5,
        }
    }
}

/// Where the response text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    Template,
    Model,
    RawData,
}

impl SummarySource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Model => "model",
            Self::RawData => "raw_data",
        }
    }
}

fn push_more(out: &mut String, total: usize, shown: usize) {
    if total > shown {
        let _ = write!(out, "\n...and {} more", total - shown);
    }
}

/// Template summary for known shapes, `None` for shapes that need the model.
pub fn render_template(
    report: &AgentReport,
    resource_group: &str,
    limits: &SummaryLimits,
) -> Option<String> {
    match report {
        AgentReport::Costs { resources } => {
            if resources.is_empty() {
                return Some(format!("No resources found in {resource_group}."));
            }
            let mut out = format!(
                "Found {} resources in {resource_group}:",
                resources.len()
            );
            for resource in resources.iter().take(limits.max_listed_items) {
                let _ = write!(
                    out,
                    "\n- {} ({}, {})",
                    resource.name, resource.kind, resource.location
                );
            }
            push_more(&mut out, resources.len(), limits.max_listed_items);
            Some(out)
        }
        AgentReport::Optimization {
            utilization,
            idle_vms,
        } => {
            if utilization.is_empty() && idle_vms.is_empty() {
                return Some(format!("No virtual machines found in {resource_group}."));
            }
            let mut out = format!(
                "Analyzed {} VMs in {resource_group}.\nIdle/deallocated VMs: {}",
                utilization.len(),
                idle_vms.len()
            );
            for idle in idle_vms.iter().take(limits.max_listed_items) {
                let _ = write!(out, "\n- {}", idle.name);
            }
            push_more(&mut out, idle_vms.len(), limits.max_listed_items);
            Some(out)
        }
        AgentReport::Security { findings } => {
            if findings.is_empty() {
                return Some(format!("No virtual machines to scan in {resource_group}."));
            }
            let compliant = findings.iter().filter(|f| f.is_compliant()).count();
            let mut out = format!(
                "Security scan of {} VMs in {resource_group} ({compliant} fully compliant):",
                findings.len()
            );
            for finding in findings.iter().take(limits.max_listed_findings) {
                let failed: Vec<&str> = finding.failed_checks().map(|c| c.name.as_str()).collect();
                if failed.is_empty() {
                    let _ = write!(out, "\n- {}: all checks passed", finding.vm);
                } else {
                    let _ = write!(out, "\n- {}: failed {}", finding.vm, failed.join(", "));
                }
            }
            push_more(&mut out, findings.len(), limits.max_listed_findings);
            Some(out)
        }
        AgentReport::Provisioning(_) | AgentReport::Custom(_) => None,
    }
}

/// Prompt asking the model for a concise answer grounded in `data`.
pub fn summary_prompt(
    query: &str,
    context: &BTreeMap<String, String>,
    intent: Intent,
    data: &BTreeMap<String, Value>,
) -> String {
    let context_text = if context.is_empty() {
        "(none)".to_string()
    } else {
        context
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "You are a helpful cloud operations assistant.\n\n\
         User query: {query}\n\
         Context: {context_text}\n\n\
         Data retrieved by the {} agent:\n{}\n\n\
         Provide a concise, human-readable answer to the user based on this data.",
        intent.category(),
        pretty_json(data)
    )
}

fn pretty_json(data: &BTreeMap<String, Value>) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| format!("{data:?}"))
}

/// Summary used when the model could not produce one.
pub fn raw_data_summary(data: &BTreeMap<String, Value>) -> String {
    format!(
        "Summary unavailable; raw results follow.\n{}",
        pretty_json(data)
    )
}
