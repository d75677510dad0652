//! Pipesync Source
//!
//! Fetches the configuration repository that holds the pipeline definition.
//! Each fetch is a shallow (depth-1) clone of the default branch into a
//! freshly allocated temporary directory; history is never needed because
//! the checkout lives only for one sync cycle.
//!
//! The returned [`TempDir`] hands ownership of the checkout to the caller,
//! which removes it when the cycle ends.

use std::sync::Arc;

use pipesync_command::{Command, CommandRunner};
use tempfile::TempDir;
use tracing::{info, instrument};

/// Errors that can occur while fetching the source repository.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The checkout directory could not be allocated.
  #[error("failed to allocate checkout directory: {0}")]
  TempDir(#[source] std::io::Error),

  /// The clone command failed to launch or exited non-zero.
  #[error("git clone failed")]
  Clone(#[source] pipesync_command::Error),
}

/// Clones the configuration repository for one sync cycle.
pub struct SourceFetcher {
  runner: Arc<dyn CommandRunner>,
  repo_url: String,
}

impl SourceFetcher {
  /// Create a fetcher for the given repository URL.
  pub fn new(runner: Arc<dyn CommandRunner>, repo_url: impl Into<String>) -> Self {
    Self {
      runner,
      repo_url: repo_url.into(),
    }
  }

  /// Shallow-clone the repository into a fresh temporary directory.
  #[instrument(name = "fetch_source", skip(self), fields(repo_url = %self.repo_url))]
  pub async fn fetch(&self) -> Result<TempDir, Error> {
    let checkout = tempfile::Builder::new()
      .prefix("pipesync")
      .tempdir()
      .map_err(Error::TempDir)?;

    let clone = Command::new("git")
      .arg("clone")
      .args(["--depth", "1"])
      .arg(&self.repo_url)
      .arg(checkout.path().to_string_lossy());

    self.runner.run(clone).await.map_err(Error::Clone)?;
    info!(checkout = %checkout.path().display(), "cloned pipeline repository");

    Ok(checkout)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::path::PathBuf;
  use std::sync::Mutex;

  use async_trait::async_trait;
  use pipesync_command::Output;

  /// Records every command and optionally fails all of them.
  struct RecordingRunner {
    calls: Mutex<Vec<Command>>,
    fail: bool,
  }

  impl RecordingRunner {
    fn new(fail: bool) -> Self {
      Self {
        calls: Mutex::new(Vec::new()),
        fail,
      }
    }

    fn calls(&self) -> Vec<Command> {
      self.calls.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl CommandRunner for RecordingRunner {
    async fn run(&self, command: Command) -> Result<Output, pipesync_command::Error> {
      self.calls.lock().unwrap().push(command.clone());
      if self.fail {
        return Err(pipesync_command::Error::NonZeroExit {
          program: command.program,
          status: 128,
          output: "fatal: repository not found".to_string(),
        });
      }
      Ok(Output {
        status: 0,
        output: String::new(),
      })
    }
  }

  #[tokio::test]
  async fn test_clone_command_shape() {
    let runner = Arc::new(RecordingRunner::new(false));
    let fetcher = SourceFetcher::new(runner.clone(), "https://example.com/pipelines.git");

    let checkout = fetcher.fetch().await.expect("fetch should succeed");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "git");
    let expected = vec![
      "clone".to_string(),
      "--depth".to_string(),
      "1".to_string(),
      "https://example.com/pipelines.git".to_string(),
      checkout.path().to_string_lossy().into_owned(),
    ];
    assert_eq!(calls[0].args, expected);
  }

  #[tokio::test]
  async fn test_checkout_directory_is_fresh_and_empty() {
    let runner = Arc::new(RecordingRunner::new(false));
    let fetcher = SourceFetcher::new(runner, "https://example.com/pipelines.git");

    let checkout = fetcher.fetch().await.expect("fetch should succeed");

    assert!(checkout.path().is_dir());
    let entries: Vec<_> = std::fs::read_dir(checkout.path()).unwrap().collect();
    assert!(entries.is_empty());
  }

  #[tokio::test]
  async fn test_clone_failure_propagates() {
    let runner = Arc::new(RecordingRunner::new(true));
    let fetcher = SourceFetcher::new(runner, "https://example.com/missing.git");

    let result = fetcher.fetch().await;

    assert!(matches!(result, Err(Error::Clone(_))));
  }

  #[tokio::test]
  async fn test_consecutive_fetches_use_distinct_directories() {
    let runner = Arc::new(RecordingRunner::new(false));
    let fetcher = SourceFetcher::new(runner, "https://example.com/pipelines.git");

    let first = fetcher.fetch().await.expect("fetch should succeed");
    let second = fetcher.fetch().await.expect("fetch should succeed");

    assert_ne!(
      PathBuf::from(first.path()),
      PathBuf::from(second.path())
    );
  }
}
