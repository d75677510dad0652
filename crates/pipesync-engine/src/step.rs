//! The sync step chain.

use std::fmt;

/// A single step in the sync cycle.
///
/// The chain is strictly linear: no branching, no retry edges. A cycle runs
/// [`Step::SEQUENCE`] in order and stops at the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// Shallow-clone the configuration repository.
  FetchSource,
  /// Refresh the credentials file from the instance metadata service.
  MaterializeCredentials,
  /// Set and unpause the pipeline through the fly CLI.
  PublishPipeline,
}

impl Step {
  /// The fixed order steps run in.
  pub const SEQUENCE: [Step; 3] = [
    Step::FetchSource,
    Step::MaterializeCredentials,
    Step::PublishPipeline,
  ];

  /// Stable name used in log events.
  pub fn name(self) -> &'static str {
    match self {
      Step::FetchSource => "fetch_source",
      Step::MaterializeCredentials => "materialize_credentials",
      Step::PublishPipeline => "publish_pipeline",
    }
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
