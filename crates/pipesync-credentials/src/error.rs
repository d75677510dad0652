//! Credential materialization errors.

/// Errors that can occur while materializing credentials.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// A metadata request failed or returned an error status.
  #[error("metadata request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// The metadata base URL or a derived URL is invalid.
  #[error("invalid metadata url: {0}")]
  Url(#[from] url::ParseError),

  /// The metadata service listed no IAM role.
  #[error("instance metadata listed no IAM role")]
  NoRole,

  /// The metadata service listed more than one IAM role.
  #[error("instance metadata listed {count} IAM roles, expected exactly one")]
  AmbiguousRole { count: usize },

  /// The credentials template failed to render.
  #[error("failed to render credentials template: {0}")]
  Template(#[from] minijinja::Error),

  /// Writing the credentials file failed.
  #[error("failed to write credentials file: {0}")]
  Io(#[from] std::io::Error),
}
