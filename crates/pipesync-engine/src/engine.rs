//! The sync engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pipesync_command::CommandRunner;
use pipesync_concourse::{FlyCli, FlyConfig};
use pipesync_credentials::{CredentialMaterializer, MetadataClient};
use pipesync_source::SourceFetcher;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::SyncError;
use crate::step::Step;

/// Fixed configuration for the sync engine, read-only for the process
/// lifetime.
#[derive(Debug, Clone)]
pub struct SyncConfig {
  /// URL of the repository holding the pipeline definition.
  pub repo_url: String,
  /// Path of the pipeline definition, relative to the checkout root.
  pub pipeline_config: String,
  /// Pipeline name to set and unpause.
  pub pipeline: String,
  /// Fly target name.
  pub target: String,
  /// Base URL of the Concourse API.
  pub concourse_url: String,
  /// Base URL of the instance metadata service.
  pub metadata_url: String,
  /// S3 bucket rendered into the credentials file.
  pub bucket: String,
  /// AWS region rendered into the credentials file.
  pub region: String,
  /// Where the rendered credentials file is written.
  pub credentials_path: PathBuf,
  /// Where the fly CLI lives (or gets installed).
  pub cli_path: PathBuf,
  /// Delay between sync cycles.
  pub interval: Duration,
  /// Concourse basic-auth username.
  pub username: String,
  /// Concourse basic-auth password.
  pub password: String,
}

/// Per-cycle state, created fresh for every cycle and discarded at its end.
#[derive(Default)]
struct CycleContext {
  /// Set by the fetch step, taken by cleanup. `Some` only while the
  /// checkout is live on disk.
  checkout: Option<TempDir>,
}

/// Drives the sync cycle forever.
///
/// Each cycle runs the step chain (fetch → materialize credentials →
/// publish), stops at the first failure, removes the checkout directory
/// unconditionally, and sleeps for the configured interval. A failed cycle
/// never stops the engine; the next cycle re-derives all state from scratch.
///
/// The engine enforces no timeouts of its own: a hung external command
/// stalls the cycle until it returns. Accepted limitation; wrap the runner
/// if stronger guarantees are needed.
pub struct SyncEngine {
  fetcher: SourceFetcher,
  materializer: CredentialMaterializer,
  fly: FlyCli,
  interval: Duration,
}

impl SyncEngine {
  /// Create an engine from fixed configuration and a command runner.
  pub fn new(config: SyncConfig, runner: Arc<dyn CommandRunner>) -> Result<Self, SyncError> {
    let fetcher = SourceFetcher::new(runner.clone(), &config.repo_url);

    let client = MetadataClient::new(&config.metadata_url)?;
    let materializer = CredentialMaterializer::new(
      client,
      &config.bucket,
      &config.region,
      &config.credentials_path,
    );

    let fly = FlyCli::new(
      FlyConfig {
        concourse_url: config.concourse_url,
        cli_path: config.cli_path,
        target: config.target,
        pipeline: config.pipeline,
        pipeline_config: config.pipeline_config,
        credentials_path: config.credentials_path,
        username: config.username,
        password: config.password,
      },
      runner,
    )?;

    Ok(Self {
      fetcher,
      materializer,
      fly,
      interval: config.interval,
    })
  }

  /// Run sync cycles until the token is cancelled.
  ///
  /// Cycle errors are logged and swallowed; only cancellation ends the
  /// loop.
  pub async fn run(&self, cancel: CancellationToken) {
    info!(interval_secs = self.interval.as_secs(), "starting sync engine");

    loop {
      if cancel.is_cancelled() {
        info!("sync engine cancelled");
        return;
      }

      match self.run_cycle().await {
        Ok(()) => {
          info!("cycle_completed");
        }
        Err(e) => {
          error!(step = %e.step(), error = %e, "cycle_failed");
        }
      }

      tokio::select! {
        _ = cancel.cancelled() => {
          info!("sync engine cancelled");
          return;
        }
        _ = tokio::time::sleep(self.interval) => {}
      }
    }
  }

  /// Run one full cycle: execute the step chain, then clean up.
  ///
  /// Public so one-shot runs and tests can drive a cycle without the loop.
  #[instrument(name = "sync_cycle", skip(self))]
  pub async fn run_cycle(&self) -> Result<(), SyncError> {
    let mut ctx = CycleContext::default();

    let result = self.execute_chain(&mut ctx).await;

    // Cleanup happens regardless of how far the chain progressed.
    self.cleanup(&mut ctx);

    result
  }

  /// Execute the step chain in order, stopping at the first failure.
  async fn execute_chain(&self, ctx: &mut CycleContext) -> Result<(), SyncError> {
    for step in Step::SEQUENCE {
      info!(step = %step, "step_started");

      match self.execute_step(step, ctx).await {
        Ok(()) => {
          info!(step = %step, "step_completed");
        }
        Err(e) => {
          error!(step = %step, error = %e, "step_failed");
          return Err(e);
        }
      }
    }

    Ok(())
  }

  async fn execute_step(&self, step: Step, ctx: &mut CycleContext) -> Result<(), SyncError> {
    match step {
      Step::FetchSource => {
        let checkout = self.fetcher.fetch().await?;
        ctx.checkout = Some(checkout);
      }
      Step::MaterializeCredentials => {
        self.materializer.materialize().await?;
      }
      Step::PublishPipeline => {
        let checkout = ctx.checkout.as_ref().ok_or(SyncError::CheckoutMissing)?;
        self.fly.publish(checkout.path()).await?;
      }
    }

    Ok(())
  }

  /// Remove the cycle's checkout directory, if one was allocated.
  ///
  /// Removal failure is logged as a warning and never escalated.
  fn cleanup(&self, ctx: &mut CycleContext) {
    if let Some(checkout) = ctx.checkout.take() {
      let path = checkout.path().to_path_buf();
      match checkout.close() {
        Ok(()) => {
          debug!(path = %path.display(), "removed checkout directory");
        }
        Err(e) => {
          warn!(path = %path.display(), error = %e, "failed to remove checkout directory");
        }
      }
    }
  }
}
