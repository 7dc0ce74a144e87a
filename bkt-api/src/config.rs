//! # Configuration Management
//!
//! Client configuration loaded from a TOML file in the platform config
//! directory, with environment variable overrides.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::consts::{
  API_BASE_URL, ENV_API_BASE, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_TOKEN_ENDPOINT, EXPIRY_MARGIN_SECS,
  TOKEN_ENDPOINT_URL,
};
use crate::error::{Error, Result};
use crate::models::ClientCredentials;

/// Settings needed to construct a [`BitbucketClient`](crate::BitbucketClient)
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  /// API root; also the scope within which access tokens are sent
  pub api_base: String,
  pub token_endpoint: String,
  pub client_id: Option<String>,
  pub client_secret: Option<String>,
  /// Seconds before the declared expiry at which tokens are refreshed
  pub expiry_margin_secs: i64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      api_base: API_BASE_URL.to_string(),
      token_endpoint: TOKEN_ENDPOINT_URL.to_string(),
      client_id: None,
      client_secret: None,
      expiry_margin_secs: EXPIRY_MARGIN_SECS,
    }
  }
}

impl fmt::Debug for ClientConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ClientConfig")
      .field("api_base", &self.api_base)
      .field("token_endpoint", &self.token_endpoint)
      .field("client_id", &self.client_id)
      .field("client_secret", &self.client_secret.as_ref().map(|_| "[redacted]"))
      .field("expiry_margin_secs", &self.expiry_margin_secs)
      .finish()
  }
}

impl ClientConfig {
  /// Default location of the configuration file
  pub fn default_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("eddieland", "", "bkt")
      .ok_or_else(|| Error::Config("Failed to determine project directories".to_string()))?;
    Ok(proj_dirs.config_dir().join("config.toml"))
  }

  /// Load configuration from `path`, or the defaults if it does not exist
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      debug!("No config file at {}, using defaults", path.display());
      return Ok(Self::default());
    }

    let content = fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("Failed to read config from {}: {e}", path.display())))?;

    toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config from {}: {e}", path.display())))
  }

  /// Apply `BKT_*` environment variables over the loaded values
  pub fn with_env_overrides(mut self) -> Self {
    let var = |key: &str| std::env::var(key).ok().filter(|value| !value.trim().is_empty());

    if let Some(api_base) = var(ENV_API_BASE) {
      self.api_base = api_base;
    }
    if let Some(token_endpoint) = var(ENV_TOKEN_ENDPOINT) {
      self.token_endpoint = token_endpoint;
    }
    if let Some(client_id) = var(ENV_CLIENT_ID) {
      self.client_id = Some(client_id);
    }
    if let Some(client_secret) = var(ENV_CLIENT_SECRET) {
      self.client_secret = Some(client_secret);
    }
    self
  }

  /// API root URL, always ending in `/`
  pub fn api_base_url(&self) -> Result<Url> {
    let trimmed = self.api_base.trim();
    if trimmed.ends_with('/') {
      Ok(Url::parse(trimmed)?)
    } else {
      Ok(Url::parse(&format!("{trimmed}/"))?)
    }
  }

  pub fn token_endpoint_url(&self) -> Result<Url> {
    Ok(Url::parse(self.token_endpoint.trim())?)
  }

  /// Client credentials, if both halves are configured
  pub fn client_credentials(&self) -> Option<ClientCredentials> {
    match (&self.client_id, &self.client_secret) {
      (Some(id), Some(secret)) => Some(ClientCredentials::new(id.as_str(), secret.as_str())),
      _ => None,
    }
  }

  pub fn expiry_margin(&self) -> Result<TimeDelta> {
    TimeDelta::try_seconds(self.expiry_margin_secs)
      .ok_or_else(|| Error::Config(format!("expiry_margin_secs out of range: {}", self.expiry_margin_secs)))
  }
}

#[cfg(test)]
mod tests {
  use bkt_test_utils::EnvVarGuard;
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn test_default_config() {
    let config = ClientConfig::default();

    assert_eq!(config.api_base_url().unwrap().as_str(), API_BASE_URL);
    assert_eq!(config.token_endpoint_url().unwrap().as_str(), TOKEN_ENDPOINT_URL);
    assert_eq!(config.expiry_margin().unwrap(), TimeDelta::seconds(60));
    assert!(config.client_credentials().is_none());
  }

  #[test]
  fn test_load_missing_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = ClientConfig::load(&temp_dir.path().join("config.toml")).unwrap();

    assert_eq!(config, ClientConfig::default());
  }

  #[test]
  fn test_load_from_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
      &path,
      r#"
api_base = "https://bitbucket.example.com/rest/2.0"
client_id = "abc"
client_secret = "xyz"
expiry_margin_secs = 300
"#,
    )
    .unwrap();

    let config = ClientConfig::load(&path).unwrap();

    assert_eq!(
      config.api_base_url().unwrap().as_str(),
      "https://bitbucket.example.com/rest/2.0/"
    );
    assert_eq!(config.token_endpoint, TOKEN_ENDPOINT_URL);
    assert_eq!(config.client_credentials(), Some(ClientCredentials::new("abc", "xyz")));
    assert_eq!(config.expiry_margin().unwrap(), TimeDelta::seconds(300));
  }

  #[test]
  fn test_load_invalid_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "api_base = [").unwrap();

    let error = ClientConfig::load(&path).unwrap_err().to_string();
    assert!(error.contains("Failed to parse config"));
  }

  #[test]
  fn test_env_overrides_win() {
    let id_guard = EnvVarGuard::set_to(ENV_CLIENT_ID, "env-id");
    let secret_guard = EnvVarGuard::set_to(ENV_CLIENT_SECRET, "env-secret");
    let base_guard = EnvVarGuard::new(ENV_API_BASE);
    base_guard.remove();

    let config = ClientConfig {
      client_id: Some("file-id".to_string()),
      ..ClientConfig::default()
    }
    .with_env_overrides();

    assert_eq!(config.client_id.as_deref(), Some("env-id"));
    assert_eq!(config.client_secret.as_deref(), Some("env-secret"));
    assert_eq!(config.api_base, API_BASE_URL);

    drop((id_guard, secret_guard, base_guard));
  }

  #[test]
  fn test_out_of_range_expiry_margin_is_rejected() {
    let config = ClientConfig {
      expiry_margin_secs: i64::MAX,
      ..ClientConfig::default()
    };

    let error = config.expiry_margin().unwrap_err();
    assert!(matches!(error, Error::Config(_)));
  }

  #[test]
  fn test_debug_redacts_secret() {
    let config = ClientConfig {
      client_secret: Some("hunter2".to_string()),
      ..ClientConfig::default()
    };

    assert!(!format!("{config:?}").contains("hunter2"));
  }

  #[test]
  fn test_default_path_is_toml() {
    let path = ClientConfig::default_path().unwrap();
    assert!(path.ends_with("config.toml"));
  }
}
