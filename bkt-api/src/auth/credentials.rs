//! Credential suppliers and `Authorization` header construction.

use std::future::Future;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::HeaderValue;

use crate::error::Result;
use crate::models::ClientCredentials;

/// Source of an `Authorization` header value
pub trait CredentialSupplier: Send + Sync {
  /// The header value to attach, or `None` to send the request as is
  fn authorization(&self) -> impl Future<Output = Result<Option<HeaderValue>>> + Send;
}

/// Build a Basic-scheme header value from `id:secret`
pub fn basic_authorization(id: &str, secret: &str) -> Result<HeaderValue> {
  let encoded = STANDARD.encode(format!("{id}:{secret}"));
  sensitive(format!("Basic {encoded}"))
}

/// Build a Bearer-scheme header value
pub fn bearer_authorization(token: &str) -> Result<HeaderValue> {
  sensitive(format!("Bearer {token}"))
}

fn sensitive(value: String) -> Result<HeaderValue> {
  let mut value = HeaderValue::try_from(value)?;
  value.set_sensitive(true);
  Ok(value)
}

/// Client credentials always authenticate with the Basic scheme
impl CredentialSupplier for ClientCredentials {
  async fn authorization(&self) -> Result<Option<HeaderValue>> {
    basic_authorization(&self.id, &self.secret).map(Some)
  }
}

/// A fixed Bearer token that is never refreshed
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }
}

impl std::fmt::Debug for BearerToken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("BearerToken([redacted])")
  }
}

impl CredentialSupplier for BearerToken {
  async fn authorization(&self) -> Result<Option<HeaderValue>> {
    bearer_authorization(&self.0).map(Some)
  }
}

impl<S: CredentialSupplier> CredentialSupplier for Arc<S> {
  fn authorization(&self) -> impl Future<Output = Result<Option<HeaderValue>>> + Send {
    (**self).authorization()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_basic_authorization() {
    let value = basic_authorization("abc", "xyz").unwrap();
    assert_eq!(value, "Basic YWJjOnh5eg==");
    assert!(value.is_sensitive());
  }

  #[test]
  fn test_bearer_authorization() {
    let value = bearer_authorization("a1").unwrap();
    assert_eq!(value, "Bearer a1");
  }

  #[test]
  fn test_bearer_authorization_rejects_control_characters() {
    assert!(bearer_authorization("bad\ntoken").is_err());
  }

  #[tokio::test]
  async fn test_client_credentials_supply_basic() -> anyhow::Result<()> {
    let creds = ClientCredentials::new("test_user", "test_token");
    let value = creds.authorization().await?;

    assert_eq!(value.unwrap(), "Basic dGVzdF91c2VyOnRlc3RfdG9rZW4=");
    Ok(())
  }
}
