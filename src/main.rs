#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::needless_raw_string_hashes,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_wraps
)]

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use cloudpilot::agent::{Assessment, Intent, Query, QueryResponse};
use cloudpilot::{config, observability, providers, AppContext, Config};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("context key cannot be empty".to_string());
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// `cloudpilot` - ask your cloud questions in plain language.
#[derive(Parser, Debug)]
#[command(name = "cloudpilot")]
#[command(version)]
#[command(about = "Natural-language cloud resource management.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about (or request a change to) your cloud resources
    #[command(long_about = "\
Ask a question about, or request a change to, your cloud resources.

The query is classified into an intent (optimization, costs, security, \
provisioning), routed to the matching agent, and the agent's results are \
summarized. Keyword matches never call the language model.

Examples:
  cloudpilot query \"show me the cost of my resources\" -g rg-prod
  cloudpilot query \"are any VMs idle?\" --json
  cloudpilot query \"create a storage account\" -g rg-dev --context env=dev")]
    Query {
        /// The question or request, in plain language
        text: String,

        /// Resource group to scope the query to; defaults to config orchestrator.default_resource_group
        #[arg(short = 'g', long)]
        resource_group: Option<String>,

        /// Extra context passed to summaries (repeatable KEY=VALUE)
        #[arg(long = "context", value_parser = parse_key_val)]
        context: Vec<(String, String)>,

        /// Print the full response (response, agents_used, data) as JSON
        #[arg(long)]
        json: bool,

        /// Print dispatch metrics (Prometheus text format) after the response
        #[arg(long)]
        metrics: bool,
    },

    /// Assess a resource group across optimization, cost and security
    #[command(long_about = "\
Assess a resource group across optimization, cost and security.

Collects VM utilization, idle VMs, resources and security findings, then \
asks the language model for an overall risk rating and suggested actions. \
If the model is unavailable a fallback decision is reported.

Examples:
  cloudpilot assess -g rg-prod
  cloudpilot assess --json > assessment.json")]
    Assess {
        /// Resource group to assess; defaults to config orchestrator.default_resource_group
        #[arg(short = 'g', long)]
        resource_group: Option<String>,

        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },

    /// List intents in priority order with their keywords
    Intents,

    /// List supported AI providers
    Providers,

    /// Show effective configuration
    Status,

    /// Manage configuration
    #[command(long_about = "\
Manage cloudpilot configuration.

Use 'schema' to dump the full JSON Schema for the config file, which \
documents every available key, type, and default value.

Examples:
  cloudpilot config schema              # print JSON Schema to stdout
  cloudpilot config schema > schema.json")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    #[command(long_about = "\
Generate shell completion scripts for `cloudpilot`.

The script is printed to stdout so it can be sourced directly:

Examples:
  source <(cloudpilot completions bash)
  cloudpilot completions zsh > ~/.zfunc/_cloudpilot
  cloudpilot completions fish > ~/.config/fish/completions/cloudpilot.fish")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Completions and static listings stay stdout-only: no config, no logging.
    match &cli.command {
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout().lock();
            return write_shell_completion(*shell, &mut stdout);
        }
        Commands::Intents => {
            print_intents();
            return Ok(());
        }
        Commands::Config {
            config_command: ConfigCommands::Schema,
        } => {
            let schema = schemars::schema_for!(config::Config);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }
        _ => {}
    }

    let config_dir = match &cli.config_dir {
        Some(dir) if dir.trim().is_empty() => bail!("--config-dir cannot be empty"),
        Some(dir) => Some(PathBuf::from(shellexpand::tilde(dir.trim()).as_ref())),
        None => None,
    };

    let config = Config::load_or_init(config_dir.as_deref()).await?;
    observability::init_tracing(&config.observability)?;

    match cli.command {
        Commands::Completions { .. } | Commands::Intents | Commands::Config { .. } => {
            unreachable!("handled before config load")
        }

        Commands::Query {
            text,
            resource_group,
            context,
            json,
            metrics,
        } => run_query(config, text, resource_group, context, json, metrics).await,

        Commands::Assess {
            resource_group,
            json,
        } => run_assess(config, resource_group, json).await,

        Commands::Status => {
            print_status(&config);
            Ok(())
        }

        Commands::Providers => {
            print_providers(&config);
            Ok(())
        }
    }
}

async fn run_query(
    config: Config,
    text: String,
    resource_group: Option<String>,
    context: Vec<(String, String)>,
    json: bool,
    with_metrics: bool,
) -> Result<()> {
    if text.trim().is_empty() {
        bail!("query text cannot be empty");
    }

    let timeout = Duration::from_secs(config.orchestrator.request_timeout_secs);
    let mut app = AppContext::from_config(config).await?;
    let metrics = if with_metrics {
        Some(app.enable_metrics()?)
    } else {
        None
    };

    let mut query = Query::new(text);
    if let Some(rg) = resource_group.as_deref().map(str::trim).filter(|rg| !rg.is_empty()) {
        query = query.with_resource_group(rg);
    }
    for (key, value) in context {
        query = query.with_context(key, value);
    }

    let response = tokio::select! {
        result = tokio::time::timeout(timeout, app.orchestrator.process(&query)) => {
            result.with_context(|| format!("Query timed out after {}s", timeout.as_secs()))??
        }
        _ = tokio::signal::ctrl_c() => bail!("Query cancelled"),
    };

    print_response(&response, json)?;

    if let Some(metrics) = metrics {
        println!();
        print!("{}", metrics.render());
    }
    Ok(())
}

fn print_response(response: &QueryResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("{}", response.response);
    println!();
    println!(
        "Agents used: {} (classified by {}, summary from {})",
        response.agents_used.join(", "),
        response.classification.method.label(),
        response.summary_source.label()
    );
    Ok(())
}

async fn run_assess(config: Config, resource_group: Option<String>, json: bool) -> Result<()> {
    let timeout = Duration::from_secs(config.orchestrator.request_timeout_secs);
    let app = AppContext::from_config(config).await?;
    let Some(rg) = app.resource_group(resource_group.as_deref()).map(str::to_string) else {
        bail!("No resource group given. Pass -g <name> or set orchestrator.default_resource_group");
    };

    let assessment = tokio::select! {
        result = tokio::time::timeout(timeout, app.assessment.assess(&rg)) => {
            result.with_context(|| format!("Assessment timed out after {}s", timeout.as_secs()))??
        }
        _ = tokio::signal::ctrl_c() => bail!("Assessment cancelled"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        print_assessment(&rg, &assessment);
    }
    Ok(())
}

fn print_assessment(resource_group: &str, assessment: &Assessment) {
    let state = &assessment.cloud_state;
    let decision = &assessment.ai_decision;

    println!("Assessment of {resource_group}");
    println!();
    println!(
        "VMs:         {} ({} idle)",
        state.resource_optimization.utilization.len(),
        state.resource_optimization.idle_resources.len()
    );
    println!("Resources:   {}", state.cost_management.len());
    println!(
        "Compliant:   {}/{}",
        state.security.iter().filter(|f| f.is_compliant()).count(),
        state.security.len()
    );
    println!();
    println!("Overall risk: {}", decision.overall_risk);
    println!("Confidence:   {}", decision.confidence);

    for (title, items) in [
        ("Optimization actions", &decision.optimization_actions),
        ("Cost reduction", &decision.cost_reduction_suggestions),
        ("Security improvements", &decision.security_improvements),
    ] {
        if items.is_empty() {
            continue;
        }
        println!();
        println!("{title}:");
        for item in items {
            match item.as_str() {
                Some(text) => println!("  - {text}"),
                None => println!("  - {item}"),
            }
        }
    }
}

fn print_intents() {
    println!("Intents (checked in priority order):\n");
    for (rank, intent) in Intent::PRIORITY.iter().enumerate() {
        let fallback = if *intent == Intent::FALLBACK {
            " (fallback)"
        } else {
            ""
        };
        println!(
            "  {}. {:<22} {}{}",
            rank + 1,
            intent.id(),
            intent.description(),
            fallback
        );
        println!("     keywords: {}", intent.keywords().join(", "));
    }
}

fn print_status(config: &Config) {
    println!("cloudpilot status");
    println!();
    println!("Version:     {}", env!("CARGO_PKG_VERSION"));
    println!("Config:      {}", config.config_path.display());
    println!();
    println!("Provider:    {}", config.provider_name());
    println!("  Model:       {}", config.model_name());
    println!("  Temperature: {}", config.default_temperature);
    println!(
        "  API key:     {}",
        if config.api_key.is_some() { "set" } else { "(not set)" }
    );
    println!(
        "Retry:       {} attempts, {}ms base delay",
        config.reliability.max_attempts, config.reliability.base_delay_ms
    );
    println!();
    println!("Cloud backend: {}", config.cloud.backend);
    println!("  Snapshot:    {}", config.snapshot_path().display());
    println!("  Location:    {}", config.cloud.default_location);
    println!(
        "  Subscription: {}",
        config.cloud.subscription_id.as_deref().unwrap_or("(none)")
    );
    println!(
        "Default resource group: {}",
        config
            .orchestrator
            .default_resource_group
            .as_deref()
            .unwrap_or("(none)")
    );
    println!(
        "Summaries:   {} items, {} findings listed",
        config.orchestrator.max_listed_items, config.orchestrator.max_listed_findings
    );
    println!("Timeout:     {}s", config.orchestrator.request_timeout_secs);
    println!();
    println!(
        "Logging:     {} (metrics: {})",
        config.observability.log_format,
        if config.observability.metrics { "on" } else { "off" }
    );
}

fn print_providers(config: &Config) {
    let providers = providers::list_providers();
    let current = config.provider_name().to_ascii_lowercase();
    println!("Supported providers ({} total):\n", providers.len());
    println!("  ID (use in config)  DESCRIPTION");
    println!("  ------------------- -----------");
    for p in &providers {
        let is_active = p.name.eq_ignore_ascii_case(&current)
            || p.aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(&current));
        let marker = if is_active { " (active)" } else { "" };
        let url_tag = if p.requires_url { " [api_url required]" } else { "" };
        let aliases = if p.aliases.is_empty() {
            String::new()
        } else {
            format!("  (aliases: {})", p.aliases.join(", "))
        };
        println!(
            "  {:<19} {}{}{}{}",
            p.name, p.display_name, url_tag, marker, aliases
        );
    }
    println!("\n  custom:<URL>   Any OpenAI-compatible endpoint");
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}
