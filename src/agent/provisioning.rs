//! Provisioning: turns a free-text request into a VM, storage account or SQL
//! database.
//!
//! The model extracts loose parameters as JSON. When extraction fails the
//! agent provisions a small Linux VM with a generated name. Backend failures
//! and unsupported resource types are reported in the outcome, never raised.

use super::traits::{AgentReport, AgentTask, CloudAgent, ProvisioningOutcome};
use crate::cloud::{AdminCredentials, ResourceProvisioner, SqlSpec, StorageSpec, VmSpec};
use crate::providers::{call_with_retry, Provider, RetryPolicy};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_VM_SIZE: &str = "Standard_B1s";
const DEFAULT_OS_TYPE: &str = "Linux";
const DEFAULT_DISTRIBUTION: &str = "Ubuntu";
const DEFAULT_REDUNDANCY: &str = "Standard_LRS";
const DEFAULT_SQL_SKU: &str = "Basic";
const DEFAULT_DATABASE: &str = "my-db";
const VM_ADMIN_USER: &str = "azureuser";
const SQL_ADMIN_USER: &str = "sqladmin";
const STORAGE_NAME_MAX: usize = 24;
const PASSWORD_LENGTH: usize = 16;
const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

/// Parameters extracted from a provisioning query. Every field is optional
/// because the model decides what to fill in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProvisioningRequest {
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub size: Option<String>,
    pub os_type: Option<String>,
    #[serde(alias = "distribution")]
    pub dist: Option<String>,
    pub redundancy: Option<String>,
    pub db_name: Option<String>,
    pub sku: Option<String>,
}

impl ProvisioningRequest {
    /// Request used when the model cannot be consulted.
    pub fn default_vm(location: &str) -> Self {
        Self {
            resource_type: Some("vm".to_string()),
            name: Some(random_name("vm-")),
            location: Some(location.to_string()),
            size: Some(DEFAULT_VM_SIZE.to_string()),
            os_type: Some(DEFAULT_OS_TYPE.to_string()),
            dist: Some(DEFAULT_DISTRIBUTION.to_string()),
            ..Self::default()
        }
    }

    fn resource_type(&self) -> String {
        self.resource_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("vm")
            .to_lowercase()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn random_name(prefix: &str) -> String {
    format!("{prefix}{}", rand::thread_rng().gen_range(1000..=9999))
}

/// Storage account names allow only lowercase letters and digits, at most 24.
pub fn storage_account_name(raw: &str) -> String {
    raw.to_lowercase()
        .replace('-', "")
        .chars()
        .take(STORAGE_NAME_MAX)
        .collect()
}

pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..PASSWORD_LENGTH)
        .filter_map(|_| PASSWORD_ALPHABET.choose(&mut rng))
        .map(|b| char::from(*b))
        .collect()
}

fn extraction_prompt(query: &str, default_location: &str) -> String {
    format!(
        r#"You are a cloud infrastructure expert.
Extract parameters from the user query to provision a cloud resource.

Supported resource types:
- "vm" (virtual machine)
- "storage" (storage account)
- "sql" (SQL server and database)

User query: "{query}"

Return JSON ONLY, for example:
{{"type": "vm", "name": "vm-name", "os_type": "Linux", "dist": "Ubuntu", "size": "{DEFAULT_VM_SIZE}", "location": "{default_location}"}}
{{"type": "storage", "name": "storageaccountname", "redundancy": "{DEFAULT_REDUNDANCY}", "location": "{default_location}"}}
{{"type": "sql", "name": "sql-server-name", "db_name": "db-name", "sku": "{DEFAULT_SQL_SKU}", "location": "{default_location}"}}

Defaults: location {default_location}, vm size {DEFAULT_VM_SIZE}, storage redundancy {DEFAULT_REDUNDANCY}, sql sku {DEFAULT_SQL_SKU}.
If no name is given, generate a short random one (like vm-1234 or store4567)."#
    )
}

pub struct ProvisioningAgent {
    model: Arc<dyn Provider>,
    retry: RetryPolicy,
    provisioner: Arc<dyn ResourceProvisioner>,
    default_location: String,
}

impl ProvisioningAgent {
    pub fn new(
        model: Arc<dyn Provider>,
        retry: RetryPolicy,
        provisioner: Arc<dyn ResourceProvisioner>,
        default_location: &str,
    ) -> Self {
        Self {
            model,
            retry,
            provisioner,
            default_location: default_location.to_string(),
        }
    }

    async fn extract_parameters(&self, query: &str) -> anyhow::Result<ProvisioningRequest> {
        let prompt = extraction_prompt(query, &self.default_location);
        let model = &self.model;
        let prompt = prompt.as_str();
        let reply = call_with_retry(&self.retry, || async move { model.complete(prompt).await }).await?;
        crate::util::parse_json_object(&reply)
    }

    /// Extract provisioning parameters, falling back to a default VM request.
    pub async fn analyze_request(&self, query: &str) -> ProvisioningRequest {
        match self.extract_parameters(query).await {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(
                    error = %crate::providers::sanitize_api_error(&format!("{error:#}")),
                    "Could not extract provisioning parameters; using default VM request"
                );
                ProvisioningRequest::default_vm(&self.default_location)
            }
        }
    }

    pub async fn provision(&self, query: &str, resource_group: &str) -> ProvisioningOutcome {
        let request = self.analyze_request(query).await;
        let resource_type = request.resource_type();
        tracing::info!(resource_group, resource_type = %resource_type, "Provisioning request");

        let result = match resource_type.as_str() {
            "vm" => self.provision_vm(&request, resource_group).await,
            "storage" => self.provision_storage(&request, resource_group).await,
            "sql" => self.provision_sql(&request, resource_group).await,
            other => {
                return ProvisioningOutcome::failed(format!("Unsupported resource type: {other}"))
            }
        };

        result.unwrap_or_else(|error| {
            tracing::warn!(resource_group, error = %error, "Provisioning failed");
            ProvisioningOutcome::failed(format!("{error:#}"))
        })
    }

    fn location<'a>(&'a self, request: &'a ProvisioningRequest) -> &'a str {
        non_empty(request.location.as_ref()).unwrap_or(self.default_location.as_str())
    }

    async fn provision_vm(
        &self,
        request: &ProvisioningRequest,
        resource_group: &str,
    ) -> anyhow::Result<ProvisioningOutcome> {
        let name = non_empty(request.name.as_ref())
            .map(str::to_string)
            .unwrap_or_else(|| random_name("vm-"));
        let spec = VmSpec {
            name: name.clone(),
            location: self.location(request).to_string(),
            size: non_empty(request.size.as_ref())
                .unwrap_or(DEFAULT_VM_SIZE)
                .to_string(),
            os_type: non_empty(request.os_type.as_ref())
                .unwrap_or(DEFAULT_OS_TYPE)
                .to_string(),
            distribution: non_empty(request.dist.as_ref())
                .unwrap_or(DEFAULT_DISTRIBUTION)
                .to_string(),
            admin: AdminCredentials {
                username: VM_ADMIN_USER.to_string(),
                password: generate_password(),
            },
        };

        let created = self
            .provisioner
            .create_virtual_machine(resource_group, &spec)
            .await?;

        Ok(ProvisioningOutcome::success(
            format!("VM created: {name}"),
            json!({
                "vm_name": name,
                "id": created.id,
                "size": spec.size,
                "location": spec.location,
                "public_ip": created.public_ip,
                "admin_user": spec.admin.username,
                "admin_password": spec.admin.password,
            }),
        ))
    }

    async fn provision_storage(
        &self,
        request: &ProvisioningRequest,
        resource_group: &str,
    ) -> anyhow::Result<ProvisioningOutcome> {
        let raw_name = non_empty(request.name.as_ref())
            .map(str::to_string)
            .unwrap_or_else(|| random_name("store"));
        let spec = StorageSpec {
            name: storage_account_name(&raw_name),
            location: self.location(request).to_string(),
            redundancy: non_empty(request.redundancy.as_ref())
                .unwrap_or(DEFAULT_REDUNDANCY)
                .to_string(),
        };

        let created = self
            .provisioner
            .create_storage_account(resource_group, &spec)
            .await?;

        Ok(ProvisioningOutcome::success(
            format!("Storage Account created: {}", spec.name),
            json!({
                "name": spec.name,
                "id": created.id,
                "redundancy": spec.redundancy,
                "primary_endpoints": created.primary_endpoints,
            }),
        ))
    }

    async fn provision_sql(
        &self,
        request: &ProvisioningRequest,
        resource_group: &str,
    ) -> anyhow::Result<ProvisioningOutcome> {
        let server_name = non_empty(request.name.as_ref())
            .map(str::to_string)
            .unwrap_or_else(|| random_name("sql-"))
            .to_lowercase();
        let spec = SqlSpec {
            server_name,
            database_name: non_empty(request.db_name.as_ref())
                .unwrap_or(DEFAULT_DATABASE)
                .to_string(),
            location: self.location(request).to_string(),
            sku: non_empty(request.sku.as_ref())
                .unwrap_or(DEFAULT_SQL_SKU)
                .to_string(),
            admin: AdminCredentials {
                username: SQL_ADMIN_USER.to_string(),
                password: generate_password(),
            },
        };

        let created = self
            .provisioner
            .create_sql_database(resource_group, &spec)
            .await?;

        Ok(ProvisioningOutcome::success(
            format!(
                "SQL Database created: {}/{}",
                spec.server_name, spec.database_name
            ),
            json!({
                "server": spec.server_name,
                "database": spec.database_name,
                "sku": spec.sku,
                "admin_user": spec.admin.username,
                "admin_password": spec.admin.password,
                "fqdn": created.fully_qualified_domain_name,
            }),
        ))
    }
}

#[async_trait]
impl CloudAgent for ProvisioningAgent {
    fn name(&self) -> &str {
        "provisioning"
    }

    async fn execute(&self, task: &AgentTask<'_>) -> anyhow::Result<AgentReport> {
        let outcome = self.provision(task.query, task.resource_group).await;
        Ok(AgentReport::Provisioning(outcome))
    }
}
