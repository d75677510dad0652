//! Credentials file rendering.

use minijinja::{Environment, Value};
use serde_json::json;

use crate::error::Error;
use crate::metadata::SecurityCredentials;

/// The load-variables document fed to `fly set-pipeline -l`.
///
/// The downstream pipeline resolves `((s3-access-key-id))` and friends
/// against these keys, so the names are part of the wire contract.
const CREDENTIALS_TEMPLATE: &str = "\
s3-bucket: {{ bucket }}
aws-region: {{ region }}
s3-access-key-id: {{ access_key_id }}
s3-secret-access-key: {{ secret_access_key }}
";

/// Render the credentials document.
pub fn render(
  credentials: &SecurityCredentials,
  bucket: &str,
  region: &str,
) -> Result<String, Error> {
  let env = Environment::new();
  let context = json!({
    "bucket": bucket,
    "region": region,
    "access_key_id": credentials.access_key_id,
    "secret_access_key": credentials.secret_access_key,
  });

  let rendered = env.render_str(CREDENTIALS_TEMPLATE, Value::from_serialize(&context))?;
  Ok(rendered)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn example_credentials() -> SecurityCredentials {
    SecurityCredentials {
      code: "Success".to_string(),
      last_updated: "2016-01-01T00:00:00Z".to_string(),
      credential_type: "AWS-HMAC".to_string(),
      access_key_id: "AKIAEXAMPLE".to_string(),
      secret_access_key: "abc123".to_string(),
      token: "session-token".to_string(),
      expiration: "2016-01-01T06:00:00Z".to_string(),
    }
  }

  #[test]
  fn test_renders_all_lines() {
    let rendered = render(&example_credentials(), "artifacts", "us-west-2").unwrap();

    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(
      lines,
      vec![
        "s3-bucket: artifacts",
        "aws-region: us-west-2",
        "s3-access-key-id: AKIAEXAMPLE",
        "s3-secret-access-key: abc123",
      ]
    );
  }

  #[test]
  fn test_session_token_is_not_rendered() {
    let rendered = render(&example_credentials(), "artifacts", "us-west-2").unwrap();

    assert!(!rendered.contains("session-token"));
  }
}
