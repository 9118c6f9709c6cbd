use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::fs::File;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "CLOUDPILOT_CONFIG_DIR";

// ── Top-level config ──────────────────────────────────────────────

/// Top-level cloudpilot configuration, loaded from `config.toml`.
///
/// Resolution order: `--config-dir` → `CLOUDPILOT_CONFIG_DIR` → `~/.cloudpilot`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Directory holding config.toml - computed, not serialized
    #[serde(skip)]
    pub config_dir: PathBuf,
    /// Path to config.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// API key for the language-model provider. Overridden by `CLOUDPILOT_API_KEY` or `API_KEY`.
    pub api_key: Option<String>,
    /// Base URL override for the provider API (required for `azure-openai`).
    pub api_url: Option<String>,
    /// Provider name: `"gemini"`, `"openai"`, `"azure-openai"` or `"custom:<URL>"`. Default: `"gemini"`.
    pub default_provider: Option<String>,
    /// Model used for classification, summaries and parameter extraction.
    pub default_model: Option<String>,
    /// Model temperature (0.0–2.0). Default: `0.2`.
    pub default_temperature: f64,

    /// Retry policy for model calls (`[reliability]`).
    #[serde(default)]
    pub reliability: ReliabilityConfig,

    /// Dispatch and summary settings (`[orchestrator]`).
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Cloud backend selection (`[cloud]`).
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Logging and metrics (`[observability]`).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ── Reliability ───────────────────────────────────────────────────

/// Retry settings for rate-limited model calls (`[reliability]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReliabilityConfig {
    /// Total attempts per model call, including the first. Default: `5`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base of the exponential backoff in milliseconds. Default: `5000`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    5_000
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────

/// Dispatch settings (`[orchestrator]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OrchestratorConfig {
    /// Resource group used when a query does not name one.
    #[serde(default)]
    pub default_resource_group: Option<String>,
    /// Resources and idle VMs listed in template summaries. Default: `10`.
    #[serde(default = "default_max_listed_items")]
    pub max_listed_items: usize,
    /// Security findings listed in template summaries. Default: `5`.
    #[serde(default = "default_max_listed_findings")]
    pub max_listed_findings: usize,
    /// Deadline for one query from the CLI, in seconds. Default: `120`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_listed_items() -> usize {
    10
}

fn default_max_listed_findings() -> usize {
    5
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_resource_group: None,
            max_listed_items: default_max_listed_items(),
            max_listed_findings: default_max_listed_findings(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Cloud ─────────────────────────────────────────────────────────

/// Cloud backend configuration (`[cloud]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CloudConfig {
    /// Backend name. Only `"snapshot"` is built in.
    #[serde(default = "default_cloud_backend")]
    pub backend: String,
    /// Inventory snapshot file. Relative paths resolve under the config directory.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Location for new resources when the request names none. Default: `"eastus"`.
    #[serde(default = "default_location")]
    pub default_location: String,
    /// Subscription used in generated resource IDs.
    #[serde(default)]
    pub subscription_id: Option<String>,
}

fn default_cloud_backend() -> String {
    "snapshot".to_string()
}

fn default_snapshot_path() -> String {
    "inventory.json".to_string()
}

fn default_location() -> String {
    "eastus".to_string()
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            backend: default_cloud_backend(),
            snapshot_path: default_snapshot_path(),
            default_location: default_location(),
            subscription_id: None,
        }
    }
}

impl CloudConfig {
    /// Snapshot path with `~` expanded and relative paths joined to `config_dir`.
    pub fn resolved_snapshot_path(&self, config_dir: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(self.snapshot_path.trim()).as_ref());
        if expanded.is_absolute() {
            expanded
        } else {
            config_dir.join(expanded)
        }
    }
}

// ── Observability ─────────────────────────────────────────────────

/// Observability configuration (`[observability]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObservabilityConfig {
    /// Log output: `"pretty"` or `"json"`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Collect dispatch metrics in a prometheus registry.
    #[serde(default)]
    pub metrics: bool,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            metrics: false,
        }
    }
}

// ── Config impl ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let config_dir = default_config_dir().unwrap_or_else(|_| PathBuf::from(".cloudpilot"));

        Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            api_key: None,
            api_url: None,
            default_provider: Some("gemini".to_string()),
            default_model: Some("gemini-2.5-flash".to_string()),
            default_temperature: 0.2,
            reliability: ReliabilityConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            cloud: CloudConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".cloudpilot"))
}

/// Pick the config directory: explicit override, then env, then `~/.cloudpilot`.
pub fn resolve_config_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_path_buf());
    }

    if let Ok(custom) = std::env::var(CONFIG_DIR_ENV) {
        let custom = custom.trim();
        if !custom.is_empty() {
            return Ok(PathBuf::from(shellexpand::tilde(custom).as_ref()));
        }
    }

    default_config_dir()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Resolve the config directory, load or create `config.toml`, then apply
    /// environment overrides and validate.
    pub async fn load_or_init(override_dir: Option<&Path>) -> Result<Self> {
        let config_dir = resolve_config_dir(override_dir)?;
        let mut config = Self::load_from_dir(&config_dir).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from `config_dir`, writing defaults on first run.
    /// No environment overrides are applied.
    pub async fn load_from_dir(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        fs::create_dir_all(config_dir).await.with_context(|| {
            format!("Failed to create config directory: {}", config_dir.display())
        })?;

        if config_path.exists() {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = fs::metadata(&config_path).await {
                    if meta.permissions().mode() & 0o004 != 0 {
                        tracing::warn!(
                            "Config file {:?} is world-readable (mode {:o}). \
                             Consider restricting with: chmod 600 {:?}",
                            config_path,
                            meta.permissions().mode() & 0o777,
                            config_path,
                        );
                    }
                }
            }

            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_dir = config_dir.to_path_buf();
            config.config_path = config_path;
            tracing::debug!(path = %config.config_path.display(), initialized = false, "Config loaded");
            Ok(config)
        } else {
            let config = Config {
                config_dir: config_dir.to_path_buf(),
                config_path: config_path.clone(),
                ..Config::default()
            };
            config.save().await?;

            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }

            tracing::info!(path = %config.config_path.display(), initialized = true, "Config created with defaults");
            Ok(config)
        }
    }

    /// Provider name with the default applied.
    pub fn provider_name(&self) -> &str {
        self.default_provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("gemini")
    }

    pub fn model_name(&self) -> &str {
        self.default_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("gemini-2.5-flash")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.cloud.resolved_snapshot_path(&self.config_dir)
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            anyhow::bail!(
                "default_temperature must be between 0.0 and 2.0 (got {})",
                self.default_temperature
            );
        }

        if self.reliability.max_attempts == 0 {
            anyhow::bail!("reliability.max_attempts must be greater than 0");
        }

        if self.orchestrator.max_listed_items == 0 {
            anyhow::bail!("orchestrator.max_listed_items must be greater than 0");
        }
        if self.orchestrator.max_listed_findings == 0 {
            anyhow::bail!("orchestrator.max_listed_findings must be greater than 0");
        }
        if self.orchestrator.request_timeout_secs == 0 {
            anyhow::bail!("orchestrator.request_timeout_secs must be greater than 0");
        }

        if self.cloud.backend.trim().is_empty() {
            anyhow::bail!("cloud.backend must not be empty");
        }

        match self.observability.log_format.as_str() {
            "pretty" | "json" => {}
            other => anyhow::bail!(
                "observability.log_format must be \"pretty\" or \"json\" (got {other:?})"
            ),
        }

        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable source. `lookup` returns the raw value
    /// of a variable, or `None` when unset.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |names: &[&str]| names.iter().find_map(|name| non_empty(lookup(name)));

        // API key: CLOUDPILOT_API_KEY or API_KEY (generic)
        if let Some(key) = first(&["CLOUDPILOT_API_KEY", "API_KEY"]) {
            self.api_key = Some(key);
        }

        if let Some(provider) = first(&["CLOUDPILOT_PROVIDER"]) {
            self.default_provider = Some(provider);
        }

        // Provider-specific keys only fill a missing key.
        if self.api_key.is_none() {
            let provider_key = match self.provider_name() {
                "gemini" | "google" => first(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
                "openai" => first(&["OPENAI_API_KEY"]),
                "azure-openai" => first(&["AZURE_OPENAI_KEY"]),
                _ => None,
            };
            if provider_key.is_some() {
                self.api_key = provider_key;
            }
        }

        if let Some(model) = first(&["CLOUDPILOT_MODEL"]) {
            self.default_model = Some(model);
        }

        if let Some(temp_str) = first(&["CLOUDPILOT_TEMPERATURE"]) {
            match temp_str.parse::<f64>() {
                Ok(temp) if (0.0..=2.0).contains(&temp) => self.default_temperature = temp,
                _ => tracing::warn!(value = %temp_str, "Ignoring invalid CLOUDPILOT_TEMPERATURE"),
            }
        }

        if let Some(group) = first(&["CLOUDPILOT_RESOURCE_GROUP", "AZURE_RESOURCE_GROUP"]) {
            self.orchestrator.default_resource_group = Some(group);
        }

        if let Some(region) = first(&["AZURE_REGION"]) {
            self.cloud.default_location = region;
        }

        if let Some(subscription) = first(&["AZURE_SUBSCRIPTION_ID"]) {
            self.cloud.subscription_id = Some(subscription);
        }

        if let Some(snapshot) = first(&["CLOUDPILOT_SNAPSHOT"]) {
            self.cloud.snapshot_path = snapshot;
        }

        if let Some(format) = first(&["CLOUDPILOT_LOG_FORMAT"]) {
            self.observability.log_format = format.to_ascii_lowercase();
        }
    }

    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;

        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or(CONFIG_FILE_NAME);
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));
        let backup_path = parent_dir.join(format!("{file_name}.bak"));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .await
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .await
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        let had_existing_config = self.config_path.exists();
        if had_existing_config {
            fs::copy(&self.config_path, &backup_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create config backup before atomic replace: {}",
                        backup_path.display()
                    )
                })?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.config_path).await {
            let _ = fs::remove_file(&temp_path).await;
            if had_existing_config && backup_path.exists() {
                fs::copy(&backup_path, &self.config_path)
                    .await
                    .context("Failed to restore config backup")?;
            }
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        sync_directory(parent_dir).await?;

        if had_existing_config {
            let _ = fs::remove_file(&backup_path).await;
        }

        Ok(())
    }
}

async fn sync_directory(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path)
            .await
            .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
        dir.sync_all()
            .await
            .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn apply(config: &mut Config, pairs: &[(&str, &str)]) {
        let env = vars(pairs);
        config.apply_overrides(|name| env.get(name).cloned());
    }

    // ── Defaults ─────────────────────────────────────────────

    #[test]
    fn config_default_has_sane_values() {
        let c = Config::default();
        assert_eq!(c.provider_name(), "gemini");
        assert_eq!(c.model_name(), "gemini-2.5-flash");
        assert!((c.default_temperature - 0.2).abs() < f64::EPSILON);
        assert!(c.api_key.is_none());
        assert_eq!(c.reliability.max_attempts, 5);
        assert_eq!(c.reliability.base_delay_ms, 5_000);
        assert_eq!(c.orchestrator.max_listed_items, 10);
        assert_eq!(c.orchestrator.max_listed_findings, 5);
        assert_eq!(c.cloud.backend, "snapshot");
        assert!(c.config_path.to_string_lossy().ends_with(CONFIG_FILE_NAME));
        c.validate().unwrap();
    }

    #[test]
    fn config_schema_export_lists_sections() {
        let schema = schemars::schema_for!(Config);
        let schema_json = serde_json::to_value(&schema).expect("schema should serialize to json");
        let properties = schema_json["properties"].as_object().unwrap();
        for key in ["reliability", "orchestrator", "cloud", "observability", "api_key"] {
            assert!(properties.contains_key(key), "missing {key}");
        }
        assert!(!properties.contains_key("config_path"));
    }

    #[test]
    fn partial_toml_fills_section_defaults() {
        let parsed: Config = toml::from_str(
            r#"
default_temperature = 0.5

[orchestrator]
default_resource_group = "rg-prod"

[reliability]
max_attempts = 3
"#,
        )
        .unwrap();

        assert_eq!(parsed.reliability.max_attempts, 3);
        assert_eq!(parsed.reliability.base_delay_ms, 5_000);
        assert_eq!(
            parsed.orchestrator.default_resource_group.as_deref(),
            Some("rg-prod")
        );
        assert_eq!(parsed.orchestrator.max_listed_items, 10);
        assert_eq!(parsed.cloud.default_location, "eastus");
        assert_eq!(parsed.provider_name(), "gemini");
    }

    // ── Validation ───────────────────────────────────────────

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = Config::default();
        c.reliability.max_attempts = 0;
        assert!(c.validate().unwrap_err().to_string().contains("max_attempts"));

        let mut c = Config::default();
        c.orchestrator.max_listed_findings = 0;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.default_temperature = 3.5;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.observability.log_format = "xml".into();
        assert!(c.validate().unwrap_err().to_string().contains("log_format"));
    }

    // ── Overrides ────────────────────────────────────────────

    #[test]
    fn override_generic_api_key_wins() {
        let mut c = Config::default();
        apply(&mut c, &[("API_KEY", "generic"), ("GEMINI_API_KEY", "gemini")]);
        assert_eq!(c.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn override_provider_specific_key_fills_missing_key() {
        let mut c = Config::default();
        apply(&mut c, &[("GEMINI_API_KEY", "  gem-key  ")]);
        assert_eq!(c.api_key.as_deref(), Some("gem-key"));

        let mut c = Config::default();
        apply(
            &mut c,
            &[("CLOUDPILOT_PROVIDER", "openai"), ("OPENAI_API_KEY", "oa-key"), ("GEMINI_API_KEY", "gem")],
        );
        assert_eq!(c.provider_name(), "openai");
        assert_eq!(c.api_key.as_deref(), Some("oa-key"));
    }

    #[test]
    fn override_resource_group_and_region() {
        let mut c = Config::default();
        apply(
            &mut c,
            &[
                ("AZURE_RESOURCE_GROUP", "rg-azure"),
                ("AZURE_REGION", "westeurope"),
                ("CLOUDPILOT_SNAPSHOT", "/tmp/inv.json"),
            ],
        );
        assert_eq!(
            c.orchestrator.default_resource_group.as_deref(),
            Some("rg-azure")
        );
        assert_eq!(c.cloud.default_location, "westeurope");
        assert_eq!(c.snapshot_path(), PathBuf::from("/tmp/inv.json"));

        apply(&mut c, &[("CLOUDPILOT_RESOURCE_GROUP", "rg-own"), ("AZURE_RESOURCE_GROUP", "rg-azure")]);
        assert_eq!(c.orchestrator.default_resource_group.as_deref(), Some("rg-own"));
    }

    #[test]
    fn override_ignores_blank_and_invalid_values() {
        let mut c = Config::default();
        apply(
            &mut c,
            &[("CLOUDPILOT_MODEL", "   "), ("CLOUDPILOT_TEMPERATURE", "9.0")],
        );
        assert_eq!(c.model_name(), "gemini-2.5-flash");
        assert!((c.default_temperature - 0.2).abs() < f64::EPSILON);

        apply(&mut c, &[("CLOUDPILOT_TEMPERATURE", "1.1")]);
        assert!((c.default_temperature - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn relative_snapshot_path_resolves_under_config_dir() {
        let cloud = CloudConfig::default();
        assert_eq!(
            cloud.resolved_snapshot_path(Path::new("/etc/cloudpilot")),
            PathBuf::from("/etc/cloudpilot/inventory.json")
        );
    }

    // ── Persistence ──────────────────────────────────────────

    #[tokio::test]
    async fn first_load_writes_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("nested");

        let config = Config::load_from_dir(&dir).await.unwrap();
        assert!(dir.join(CONFIG_FILE_NAME).exists());
        assert_eq!(config.config_dir, dir);
        assert_eq!(config.snapshot_path(), dir.join("inventory.json"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let meta = fs::metadata(dir.join(CONFIG_FILE_NAME)).await.unwrap();
            assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn save_and_reload_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::load_from_dir(tmp.path()).await.unwrap();
        config.default_model = Some("gemini-2.5-pro".into());
        config.orchestrator.default_resource_group = Some("rg-saved".into());
        config.save().await.unwrap();

        let reloaded = Config::load_from_dir(tmp.path()).await.unwrap();
        assert_eq!(reloaded.model_name(), "gemini-2.5-pro");
        assert_eq!(
            reloaded.orchestrator.default_resource_group.as_deref(),
            Some("rg-saved")
        );
        assert!(!tmp.path().join("config.toml.bak").exists());
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "default_temperature = [")
            .await
            .unwrap();
        let err = Config::load_from_dir(tmp.path()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[tokio::test]
    async fn sync_directory_handles_existing_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        sync_directory(tmp.path()).await.unwrap();
    }

    #[test]
    fn explicit_config_dir_wins() {
        let dir = resolve_config_dir(Some(Path::new("/opt/cloudpilot"))).unwrap();
        assert_eq!(dir, PathBuf::from("/opt/cloudpilot"));
    }
}
