//! Publisher errors.

/// Errors that can occur while publishing the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The Concourse base URL or a derived URL is invalid.
  #[error("invalid concourse url: {0}")]
  Url(#[from] url::ParseError),

  /// Downloading the fly CLI failed.
  #[error("fly CLI download failed: {0}")]
  Download(#[from] reqwest::Error),

  /// Installing the fly CLI on disk failed.
  #[error("failed to install fly CLI: {0}")]
  Install(#[from] std::io::Error),

  /// A fly invocation failed to launch or exited non-zero.
  #[error("fly invocation failed")]
  Fly(#[from] pipesync_command::Error),
}
