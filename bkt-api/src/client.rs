//! # Bitbucket HTTP Client
//!
//! The client context: one authenticator scoped to the API root and a fetcher
//! that routes every request through it. Clients are constructed explicitly
//! and passed around; there is no process-wide default instance.

use std::sync::Arc;

use reqwest::Client;
use url::Url;

use crate::auth::{BaseScope, OAuth2Authenticator};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::fetcher::HttpFetcher;
use crate::models::ClientCredentials;

/// Fetcher used by [`BitbucketClient`] for API calls
pub type ApiFetcher = HttpFetcher<Arc<OAuth2Authenticator>>;

/// Represents a Bitbucket API client
#[derive(Debug, Clone)]
pub struct BitbucketClient {
  pub(crate) base_url: Url,
  pub(crate) authenticator: Arc<OAuth2Authenticator>,
  pub(crate) fetcher: ApiFetcher,
}

impl BitbucketClient {
  /// Create a client from configuration
  pub fn new(config: &ClientConfig) -> Result<Self> {
    let base_url = config.api_base_url()?;
    let http = Client::new();

    let mut builder = OAuth2Authenticator::builder(BaseScope::new(base_url.clone()), config.token_endpoint_url()?)
      .expiry_margin(config.expiry_margin()?)
      .http_client(http.clone());
    if let Some(credentials) = config.client_credentials() {
      builder = builder.client_credentials(credentials);
    }

    Ok(Self::from_parts(http, base_url, builder.build()))
  }

  /// Create a client around an already configured authenticator
  pub fn with_authenticator(base_url: Url, authenticator: OAuth2Authenticator) -> Self {
    Self::from_parts(Client::new(), base_url, authenticator)
  }

  fn from_parts(http: Client, base_url: Url, authenticator: OAuth2Authenticator) -> Self {
    let authenticator = Arc::new(authenticator);
    let fetcher = HttpFetcher::with_decorator(http, Arc::clone(&authenticator));
    Self {
      base_url,
      authenticator,
      fetcher,
    }
  }

  /// API root under which resource paths are resolved
  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// The authenticator attached to every in-scope request
  pub fn authenticator(&self) -> &Arc<OAuth2Authenticator> {
    &self.authenticator
  }

  pub fn fetcher(&self) -> &ApiFetcher {
    &self.fetcher
  }
}

/// Create a Bitbucket Cloud client from OAuth2 consumer credentials
pub fn create_bitbucket_client(client_id: &str, client_secret: &str) -> Result<BitbucketClient> {
  let credentials = ClientCredentials::new(client_id, client_secret);
  let config = ClientConfig {
    client_id: Some(credentials.id),
    client_secret: Some(credentials.secret),
    ..ClientConfig::default()
  };

  BitbucketClient::new(&config)
}
