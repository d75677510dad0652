use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use pipesync_command::ProcessRunner;
use pipesync_engine::{SyncConfig, SyncEngine};

mod logging;

/// Pipesync - keeps a Concourse pipeline continuously published.
///
/// Every cycle it shallow-clones the repository holding the pipeline
/// definition, pulls fresh temporary credentials from the instance metadata
/// service, and re-applies the pipeline through the fly CLI.
#[derive(Parser)]
#[command(name = "pipesync")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Concourse basic-auth username
  #[arg(long, value_parser = word_value)]
  username: String,

  /// Concourse basic-auth password
  #[arg(long, value_parser = word_value)]
  password: String,

  /// URL of the repository holding the pipeline definition
  #[arg(long)]
  repo_url: String,

  /// Path of the pipeline definition, relative to the checkout root
  #[arg(long, default_value = "pipeline.yml")]
  pipeline_config: String,

  /// Name of the pipeline to set and unpause
  #[arg(long, default_value = "ci")]
  pipeline: String,

  /// Name of the fly target to log in to
  #[arg(long, default_value = "local")]
  target: String,

  /// Base URL of the Concourse API
  #[arg(long, default_value = "http://localhost:8080")]
  concourse_url: String,

  /// Base URL of the instance metadata service
  #[arg(long, default_value = "http://169.254.169.254")]
  metadata_url: String,

  /// S3 bucket rendered into the credentials file
  #[arg(long)]
  bucket: String,

  /// AWS region rendered into the credentials file
  #[arg(long, default_value = "us-west-2")]
  region: String,

  /// Where to write the rendered credentials file (default: ~/.pipesync/aws-credentials.yml)
  #[arg(long)]
  credentials_path: Option<PathBuf>,

  /// Where to install the fly CLI (default: ~/.pipesync/fly)
  #[arg(long)]
  cli_path: Option<PathBuf>,

  /// Seconds to wait between sync cycles
  #[arg(long, default_value_t = 300)]
  interval: u64,

  /// Log level when RUST_LOG is not set
  #[arg(long, default_value = "info")]
  log_level: String,
}

/// Reject empty values and anything beyond word characters, so secrets are
/// never silently mangled by the shell.
fn word_value(value: &str) -> Result<String, String> {
  if value.is_empty() {
    return Err("value must not be empty".to_string());
  }
  if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err("value may only contain word characters".to_string());
  }
  Ok(value.to_string())
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  logging::init(&cli.log_level);

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
  let data_dir = dirs::home_dir()
    .context("could not determine home directory")?
    .join(".pipesync");

  let config = SyncConfig {
    repo_url: cli.repo_url,
    pipeline_config: cli.pipeline_config,
    pipeline: cli.pipeline,
    target: cli.target,
    concourse_url: cli.concourse_url,
    metadata_url: cli.metadata_url,
    bucket: cli.bucket,
    region: cli.region,
    credentials_path: cli
      .credentials_path
      .unwrap_or_else(|| data_dir.join("aws-credentials.yml")),
    cli_path: cli.cli_path.unwrap_or_else(|| data_dir.join("fly")),
    interval: Duration::from_secs(cli.interval),
    username: cli.username,
    password: cli.password,
  };

  let runner = Arc::new(ProcessRunner);
  let engine = SyncEngine::new(config, runner).context("failed to create sync engine")?;

  let cancel = CancellationToken::new();
  let signal_cancel = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("received ctrl-c, shutting down");
      signal_cancel.cancel();
    }
  });

  engine.run(cancel).await;

  Ok(())
}
