//! Instance metadata service client.
//!
//! The metadata service is a local-only HTTP endpoint exposing the IAM role
//! attached to the running instance and that role's temporary credentials.
//! Both lookups happen once per sync cycle, since the credentials rotate.

use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::Error;

const SECURITY_CREDENTIALS_PATH: &str = "latest/meta-data/iam/security-credentials/";

/// Temporary credentials for an IAM role, as served by the metadata service.
///
/// Held in memory only for the duration of one cycle's rendering; never
/// persisted beyond the rendered credentials file.
#[derive(Clone, Deserialize)]
pub struct SecurityCredentials {
  #[serde(rename = "Code")]
  pub code: String,
  #[serde(rename = "LastUpdated")]
  pub last_updated: String,
  #[serde(rename = "Type")]
  pub credential_type: String,
  // The live metadata document spells this "AccessKeyId"; accept both.
  #[serde(rename = "AccessKeyID", alias = "AccessKeyId")]
  pub access_key_id: String,
  #[serde(rename = "SecretAccessKey")]
  pub secret_access_key: String,
  #[serde(rename = "Token")]
  pub token: String,
  #[serde(rename = "Expiration")]
  pub expiration: String,
}

// Manual impl so the secret and session token never reach a log line.
impl fmt::Debug for SecurityCredentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SecurityCredentials")
      .field("code", &self.code)
      .field("last_updated", &self.last_updated)
      .field("credential_type", &self.credential_type)
      .field("access_key_id", &self.access_key_id)
      .field("secret_access_key", &"<redacted>")
      .field("token", &"<redacted>")
      .field("expiration", &self.expiration)
      .finish()
  }
}

/// Client for the instance metadata service.
pub struct MetadataClient {
  http: Client,
  base: Url,
}

impl MetadataClient {
  /// Create a client for the given metadata base URL.
  pub fn new(base_url: &str) -> Result<Self, Error> {
    Ok(Self {
      http: Client::new(),
      base: Url::parse(base_url)?,
    })
  }

  /// Discover the IAM role attached to the instance.
  ///
  /// The listing endpoint returns role names as plain text, one per line.
  /// Exactly one role is expected in this deployment model; zero or several
  /// are rejected rather than guessed at.
  pub async fn role(&self) -> Result<String, Error> {
    let url = self.base.join(SECURITY_CREDENTIALS_PATH)?;
    let body = self
      .http
      .get(url)
      .send()
      .await?
      .error_for_status()?
      .text()
      .await?;

    let roles: Vec<&str> = body
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .collect();

    match roles.as_slice() {
      [] => Err(Error::NoRole),
      [role] => Ok((*role).to_string()),
      many => Err(Error::AmbiguousRole { count: many.len() }),
    }
  }

  /// Fetch the temporary credentials for a role.
  pub async fn credentials(&self, role: &str) -> Result<SecurityCredentials, Error> {
    let url = self
      .base
      .join(SECURITY_CREDENTIALS_PATH)?
      .join(role)?;

    let credentials = self
      .http
      .get(url)
      .send()
      .await?
      .error_for_status()?
      .json::<SecurityCredentials>()
      .await?;

    Ok(credentials)
  }
}
