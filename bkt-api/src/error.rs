//! # Error Types
//!
//! Failures surfaced by the client. Transport and status errors are passed
//! through unchanged; nothing in this crate retries or swallows them.

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Errors that can occur while talking to the API
#[derive(Debug, Error)]
pub enum Error {
  #[error("HTTP transport failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Unexpected error: HTTP {status} from {url} - {body}")]
  Status { status: StatusCode, url: Url, body: String },

  #[error("Malformed token response: {0}")]
  TokenResponse(#[source] serde_json::Error),

  #[error("Malformed page at {url}: {reason}")]
  MalformedPage { url: Url, reason: String },

  #[error("Failed to decode JSON: {0}")]
  Decode(#[source] serde_json::Error),

  #[error("Index {index} out of range for collection of {len} items")]
  IndexOutOfRange { index: usize, len: usize },

  #[error("Invalid header value: {0}")]
  InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

  #[error("Invalid URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("Missing client credentials for the token endpoint")]
  MissingClientCredentials,

  #[error("Configuration error: {0}")]
  Config(String),
}

impl Error {
  /// The HTTP status carried by a [`Error::Status`] failure, if any
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      Self::Status { status, .. } => Some(*status),
      Self::Transport(err) => err.status(),
      _ => None,
    }
  }
}

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
