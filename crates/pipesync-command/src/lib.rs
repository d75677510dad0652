//! Pipesync Command
//!
//! This crate provides the external-command seam for pipesync. Every shell
//! tool the daemon drives (git, the fly CLI) goes through the
//! [`CommandRunner`] trait so the engine and publisher logic can be tested
//! against a recording fake without spawning real processes.
//!
//! [`ProcessRunner`] is the production implementation on `tokio::process`.

mod process;

pub use process::ProcessRunner;

use std::path::PathBuf;

use async_trait::async_trait;

/// A description of an external command to run.
#[derive(Debug, Clone)]
pub struct Command {
  /// Program name or path.
  pub program: String,
  /// Arguments, in order.
  pub args: Vec<String>,
  /// Working directory, if different from the current one.
  pub current_dir: Option<PathBuf>,
}

impl Command {
  /// Create a command with no arguments.
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      current_dir: None,
    }
  }

  /// Append a single argument.
  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  /// Append several arguments.
  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Set the working directory.
  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.current_dir = Some(dir.into());
    self
  }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct Output {
  /// Exit status code (0 on success).
  pub status: i32,
  /// Combined stdout and stderr.
  pub output: String,
}

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The program could not be launched at all.
  #[error("failed to spawn '{program}'")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The program ran but exited with a non-zero status.
  #[error("'{program}' exited with status {status}")]
  NonZeroExit {
    program: String,
    status: i32,
    /// Combined output from the failed command.
    output: String,
  },
}

/// Command execution trait.
///
/// Implementations run the described command to completion, capture its
/// combined output, and surface a non-zero exit as an error.
#[async_trait]
pub trait CommandRunner: Send + Sync {
  /// Run a command to completion.
  async fn run(&self, command: Command) -> Result<Output, Error>;
}
