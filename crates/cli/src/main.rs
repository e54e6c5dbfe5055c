use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use wfsync_engine::config::CONFIG_PATH_ENV;
use wfsync_engine::{SyncConfig, WorkflowClient};
use wfsync_types::JobRequest;

#[derive(Debug, Parser)]
#[command(name = "wfsync", version, about = "Synchronize workflow definitions with a workflow service and queue jobs")]
struct Cli {
    /// Configuration file (JSON or YAML).
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
    /// Workflow service base URL.
    #[arg(long, global = true)]
    url: Option<String>,
    /// Directory holding workflow definition files.
    #[arg(long, global = true)]
    definitions: Option<PathBuf>,
    /// Overwrite existing workflows without comparing content.
    #[arg(long, global = true)]
    force_replace: bool,
    /// Overwrite existing workflows whose content differs.
    #[arg(long, global = true)]
    force_digest_check: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Synchronize every configured workflow and print the resolved identifiers.
    Sync,
    /// Check that the workflow service is reachable.
    Ping,
    #[command(subcommand)]
    Workflow(WorkflowCommand),
    #[command(subcommand)]
    Job(JobCommand),
}

#[derive(Debug, Subcommand)]
enum WorkflowCommand {
    /// Look up a registered workflow by display name (`name-version`).
    Find { display_name: String },
    Get { identifier: String },
    Delete { identifier: String },
}

#[derive(Debug, Subcommand)]
enum JobCommand {
    /// Synchronize workflows, then queue a job.
    Create {
        /// Configured workflow name.
        #[arg(long)]
        workflow: Option<String>,
        /// Explicit workflow identifier; wins over --workflow.
        #[arg(long = "workflow-id")]
        workflow_id: Option<String>,
        #[arg(long)]
        target: String,
        /// Job parameter as key=value; JSON values are parsed.
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
        /// Request header as name=value.
        #[arg(long = "header", value_parser = parse_key_value)]
        headers: Vec<(String, String)>,
    },
    Get { identifier: String },
    Info { identifier: String },
    /// Append an info entry (a JSON document) to a job.
    PostInfo { identifier: String, info: String },
    List {
        /// Query filter as key=value.
        #[arg(long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let client = WorkflowClient::from_config(&config).context("failed to create workflow client")?;

    match cli.command {
        Command::Sync => {
            let report = client.init_workflows().await?;
            let workflows: serde_json::Map<String, Value> = report
                .outcomes
                .iter()
                .map(|(name, outcome)| (name.clone(), Value::String(outcome.identifier().to_string())))
                .collect();
            print_json(&json!({ "attempts": report.attempts, "workflows": workflows }))
        }
        Command::Ping => print_json(&client.ping().await?),
        Command::Workflow(command) => run_workflow_command(&client, command).await,
        Command::Job(command) => run_job_command(&client, command).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Settings from file and environment, then command-line flags on top.
fn build_config(cli: &Cli) -> Result<SyncConfig> {
    let mut config = SyncConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(url) = &cli.url {
        config.url = Some(url.clone());
    }
    if let Some(definitions) = &cli.definitions {
        config.definitions_path = Some(definitions.clone());
    }
    config.force_replace |= cli.force_replace;
    config.force_digest_check |= cli.force_digest_check;
    Ok(config)
}

async fn run_workflow_command(client: &WorkflowClient, command: WorkflowCommand) -> Result<()> {
    match command {
        WorkflowCommand::Find { display_name } => match client.find_workflow(&display_name).await? {
            Some(record) => print_json(&record),
            None => bail!("no workflow named '{display_name}'"),
        },
        WorkflowCommand::Get { identifier } => print_json(&client.get_workflow(&identifier).await?),
        WorkflowCommand::Delete { identifier } => {
            client.delete_workflow(&identifier).await?;
            print_json(&json!({ "deleted": identifier }))
        }
    }
}

async fn run_job_command(client: &WorkflowClient, command: JobCommand) -> Result<()> {
    match command {
        JobCommand::Create {
            workflow,
            workflow_id,
            target,
            params,
            headers,
        } => {
            if workflow.is_none() && workflow_id.is_none() {
                bail!("either --workflow or --workflow-id is required");
            }
            if workflow.is_some() && workflow_id.is_none() {
                client.init_workflows().await.context("failed to synchronize workflows")?;
            }
            let request = job_request(workflow, workflow_id, target, params, headers);
            print_json(&client.create_job(request).await?)
        }
        JobCommand::Get { identifier } => print_json(&client.get_job(&identifier).await?),
        JobCommand::Info { identifier } => print_json(&client.get_job_info(&identifier).await?),
        JobCommand::PostInfo { identifier, info } => {
            let info: Value = serde_json::from_str(&info).context("job info must be a JSON document")?;
            client.post_job_info(&identifier, &info).await?;
            print_json(&json!({ "posted": identifier }))
        }
        JobCommand::List { query } => print_json(&client.list_jobs(&query).await?),
    }
}

fn job_request(
    workflow: Option<String>,
    workflow_id: Option<String>,
    target: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
) -> JobRequest {
    let mut request = JobRequest {
        workflow,
        ..Default::default()
    };
    for (key, raw) in params {
        let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
        request = request.with_param(key, value);
    }
    for (name, value) in headers {
        request = request.with_header(name, value);
    }
    if let Some(identifier) = workflow_id {
        request = request.with_workflow_identifier(identifier);
    }
    request.with_target(target)
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
