//! Engine errors.

use crate::step::Step;

/// Errors that can abort a sync cycle.
///
/// Every variant is cycle-local: the engine logs it and starts the next
/// cycle from scratch after the interval.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
  /// Fetching the configuration repository failed.
  #[error("failed to fetch pipeline source")]
  Source(#[from] pipesync_source::Error),

  /// Materializing instance credentials failed.
  #[error("failed to materialize instance credentials")]
  Credentials(#[from] pipesync_credentials::Error),

  /// Publishing the pipeline failed.
  #[error("failed to publish pipeline")]
  Publish(#[from] pipesync_concourse::Error),

  /// The publish step ran without a checkout; unreachable with the fixed
  /// step order.
  #[error("publish step ran without a checkout directory")]
  CheckoutMissing,
}

impl SyncError {
  /// The step this error originated from.
  pub fn step(&self) -> Step {
    match self {
      SyncError::Source(_) => Step::FetchSource,
      SyncError::Credentials(_) => Step::MaterializeCredentials,
      SyncError::Publish(_) | SyncError::CheckoutMissing => Step::PublishPipeline,
    }
  }
}
