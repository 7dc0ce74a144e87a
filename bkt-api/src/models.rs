//! # Data Models
//!
//! Credential and token data structures shared by the authenticators and the
//! client.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// OAuth2 client credentials identifying the calling application
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
  pub id: String,
  pub secret: String,
}

impl ClientCredentials {
  /// Create client credentials from an identifier and a secret
  pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      secret: secret.into(),
    }
  }
}

impl fmt::Debug for ClientCredentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ClientCredentials")
      .field("id", &self.id)
      .field("secret", &"[redacted]")
      .finish()
  }
}

/// Access token, refresh token and expiry, always handled as one unit
///
/// `expiry` is the server-asserted expiry. The refresh margin is applied by
/// the authenticator and never stored here.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
  #[serde(default)]
  pub access_token: Option<String>,
  #[serde(default)]
  pub refresh_token: Option<String>,
  #[serde(default)]
  pub expiry: Option<DateTime<Utc>>,
}

impl TokenState {
  /// Whether no token field is set
  pub fn is_empty(&self) -> bool {
    self.access_token.is_none() && self.refresh_token.is_none() && self.expiry.is_none()
  }
}

impl fmt::Debug for TokenState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let redact = |value: &Option<String>| value.as_ref().map(|_| "[redacted]");
    f.debug_struct("TokenState")
      .field("access_token", &redact(&self.access_token))
      .field("refresh_token", &redact(&self.refresh_token))
      .field("expiry", &self.expiry)
      .finish()
  }
}

/// Successful response body of the token endpoint
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
  pub access_token: String,
  #[serde(default)]
  pub refresh_token: Option<String>,
  #[serde(default)]
  pub expires_in: Option<i64>,
}

impl TokenResponse {
  /// Build the state that replaces the current one.
  ///
  /// `fallback_refresh` is kept when the response carries no refresh token.
  /// An `expires_in` that does not fit the calendar is a malformed response.
  pub fn into_state(self, now: DateTime<Utc>, fallback_refresh: Option<String>) -> Result<TokenState> {
    let expiry = match self.expires_in {
      Some(secs) => Some(
        TimeDelta::try_seconds(secs)
          .and_then(|lifetime| now.checked_add_signed(lifetime))
          .ok_or_else(|| {
            Error::TokenResponse(serde_json::Error::custom(format!("expires_in out of range: {secs}")))
          })?,
      ),
      None => None,
    };

    Ok(TokenState {
      access_token: Some(self.access_token),
      refresh_token: self.refresh_token.or(fallback_refresh),
      expiry,
    })
  }
}
