//! Pipesync Concourse
//!
//! Publishes the pipeline through the fly CLI. One publish is four
//! sub-steps, each abandoning the cycle on failure:
//!
//! 1. ensure the fly binary is installed (download once, then reuse)
//! 2. log in to the target
//! 3. set the pipeline from the checkout, loading the credentials file
//! 4. unpause the pipeline (a no-op when already unpaused)
//!
//! The download is authenticated with the same basic-auth credentials fly
//! itself logs in with, streamed to a staging file, and renamed into place
//! so a half-downloaded binary is never left at the install path.

mod error;

pub use error::Error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use pipesync_command::{Command, CommandRunner};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};
use url::Url;

/// Configuration for the fly CLI publisher.
#[derive(Debug, Clone)]
pub struct FlyConfig {
  /// Base URL of the Concourse API.
  pub concourse_url: String,
  /// Where the fly binary lives (or gets installed).
  pub cli_path: PathBuf,
  /// Fly target name to log in to.
  pub target: String,
  /// Pipeline name to set and unpause.
  pub pipeline: String,
  /// Path of the pipeline definition, relative to the checkout root.
  pub pipeline_config: String,
  /// Path of the rendered credentials file passed as load-variables.
  pub credentials_path: PathBuf,
  /// Concourse basic-auth username.
  pub username: String,
  /// Concourse basic-auth password.
  pub password: String,
}

/// Drives the fly CLI against a Concourse deployment.
pub struct FlyCli {
  runner: Arc<dyn CommandRunner>,
  http: reqwest::Client,
  concourse_url: Url,
  config: FlyConfig,
}

impl FlyCli {
  /// Create a publisher.
  pub fn new(config: FlyConfig, runner: Arc<dyn CommandRunner>) -> Result<Self, Error> {
    let concourse_url = Url::parse(&config.concourse_url)?;
    Ok(Self {
      runner,
      http: reqwest::Client::new(),
      concourse_url,
      config,
    })
  }

  /// Publish the pipeline from a checkout and make sure it is running.
  #[instrument(
    name = "publish_pipeline",
    skip(self, checkout),
    fields(pipeline = %self.config.pipeline)
  )]
  pub async fn publish(&self, checkout: &Path) -> Result<(), Error> {
    self.ensure_installed().await?;
    self.login().await?;
    self.set_pipeline(checkout).await?;
    self.unpause_pipeline().await?;
    info!("pipeline published");
    Ok(())
  }

  /// Download the fly binary if it is not already installed.
  ///
  /// An existing binary is reused as-is; there is no version check or
  /// refresh.
  pub async fn ensure_installed(&self) -> Result<(), Error> {
    if fs::try_exists(&self.config.cli_path).await? {
      debug!(path = %self.config.cli_path.display(), "fly CLI already installed");
      return Ok(());
    }

    let mut url = self.concourse_url.join("api/v1/cli")?;
    url
      .query_pairs_mut()
      .append_pair("arch", "amd64")
      .append_pair("platform", "linux");

    info!(url = %url, path = %self.config.cli_path.display(), "downloading fly CLI");

    let response = self
      .http
      .get(url)
      .basic_auth(&self.config.username, Some(&self.config.password))
      .send()
      .await?
      .error_for_status()?;

    if let Some(parent) = self.config.cli_path.parent() {
      fs::create_dir_all(parent).await?;
    }

    // Stage next to the destination so the final rename is atomic.
    let staging = self.config.cli_path.with_extension("partial");
    let mut file = File::create(&staging).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
      let bytes = chunk?;
      file.write_all(&bytes).await?;
    }
    file.flush().await?;
    drop(file);

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o755)).await?;
    }

    fs::rename(&staging, &self.config.cli_path).await?;
    info!(path = %self.config.cli_path.display(), "fly CLI installed");

    Ok(())
  }

  /// Log in to the fly target.
  pub async fn login(&self) -> Result<(), Error> {
    let login = Command::new(self.config.cli_path.to_string_lossy())
      .arg("login")
      .arg(format!("--username={}", self.config.username))
      .arg(format!("--password={}", self.config.password))
      .args(["-t", &self.config.target])
      .arg("-c")
      .arg(self.concourse_url.as_str());

    self.runner.run(login).await?;
    info!(target = %self.config.target, "logged in");
    Ok(())
  }

  /// Set the pipeline from the checked-out definition.
  pub async fn set_pipeline(&self, checkout: &Path) -> Result<(), Error> {
    let definition = checkout.join(&self.config.pipeline_config);

    let set = Command::new(self.config.cli_path.to_string_lossy())
      .args(["-t", &self.config.target])
      .arg("set-pipeline")
      .args(["-p", &self.config.pipeline])
      .arg("-c")
      .arg(definition.to_string_lossy())
      .arg("-l")
      .arg(self.config.credentials_path.to_string_lossy())
      .arg("-n");

    self.runner.run(set).await?;
    info!(pipeline = %self.config.pipeline, "pipeline set");
    Ok(())
  }

  /// Unpause the pipeline. Unpausing an already-unpaused pipeline succeeds.
  pub async fn unpause_pipeline(&self) -> Result<(), Error> {
    let unpause = Command::new(self.config.cli_path.to_string_lossy())
      .args(["-t", &self.config.target])
      .arg("unpause-pipeline")
      .args(["-p", &self.config.pipeline]);

    self.runner.run(unpause).await?;
    info!(pipeline = %self.config.pipeline, "pipeline unpaused");
    Ok(())
  }
}
