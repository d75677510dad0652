//! Pipesync Credentials
//!
//! This crate materializes short-lived instance credentials into the
//! load-variables file the pipeline publisher hands to fly. One
//! materialization is: discover the attached IAM role, fetch its temporary
//! credentials, render the credentials document, and persist it atomically.
//!
//! The rendered file is replaced in one rename so a concurrent reader (the
//! fly CLI) never observes partial content, and nothing is written at all
//! when any earlier part of the sequence fails.

mod error;
mod metadata;
mod render;

pub use error::Error;
pub use metadata::{MetadataClient, SecurityCredentials};
pub use render::render;

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

/// Materializes instance credentials into a file.
pub struct CredentialMaterializer {
  client: MetadataClient,
  bucket: String,
  region: String,
  output_path: PathBuf,
}

impl CredentialMaterializer {
  /// Create a materializer.
  ///
  /// # Arguments
  /// * `client` - Metadata service client
  /// * `bucket` - S3 bucket name rendered into the document
  /// * `region` - AWS region rendered into the document
  /// * `output_path` - Where the rendered file is persisted
  pub fn new(
    client: MetadataClient,
    bucket: impl Into<String>,
    region: impl Into<String>,
    output_path: impl Into<PathBuf>,
  ) -> Self {
    Self {
      client,
      bucket: bucket.into(),
      region: region.into(),
      output_path: output_path.into(),
    }
  }

  /// Refresh the credentials file from the metadata service.
  #[instrument(
    name = "materialize_credentials",
    skip(self),
    fields(output = %self.output_path.display())
  )]
  pub async fn materialize(&self) -> Result<(), Error> {
    let role = self.client.role().await?;
    info!(role = %role, "discovered instance role");

    let credentials = self.client.credentials(&role).await?;
    let rendered = render(&credentials, &self.bucket, &self.region)?;

    persist_atomic(&self.output_path, &rendered)?;
    info!("credentials file written");

    Ok(())
  }
}

/// Write `contents` to `path` in one rename.
///
/// The full document is staged in a temporary file next to the destination,
/// given mode 0o644, and renamed over the old file. Readers see either the
/// previous complete file or the new complete file.
fn persist_atomic(path: &Path, contents: &str) -> Result<(), std::io::Error> {
  let parent = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  std::fs::create_dir_all(parent)?;

  let mut staged = tempfile::NamedTempFile::new_in(parent)?;
  staged.write_all(contents.as_bytes())?;
  staged.flush()?;

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    staged
      .as_file()
      .set_permissions(std::fs::Permissions::from_mode(0o644))?;
  }

  staged.persist(path).map_err(|e| e.error)?;
  Ok(())
}
