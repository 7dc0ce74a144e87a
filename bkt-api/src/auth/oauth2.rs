//! # OAuth2 Authenticator
//!
//! Bearer credentials backed by an access/refresh token pair. Before a token
//! is attached to an in-scope request it is checked against its expiry (less
//! a safety margin) and, when due, renewed through the refresh grant.
//!
//! Token state is read without locking the refresh path, so requests with a
//! valid token never wait on each other. A renewal takes the refresh gate,
//! re-reads the state and only contacts the token endpoint if no concurrent
//! caller has renewed the token in the meantime.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, Request};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::auth::credentials::{CredentialSupplier, bearer_authorization};
use crate::auth::scope::{BaseScope, Scoped};
use crate::consts::{ACCEPT, EXPIRY_MARGIN_SECS, USER_AGENT};
use crate::error::{Error, Result};
use crate::fetcher::{HttpFetcher, RequestDecorator, ResourceFetcher};
use crate::models::{ClientCredentials, TokenResponse, TokenState};

/// Handle returned by [`OAuth2Authenticator::add_refresh_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type RefreshListener = Arc<dyn Fn(&TokenState) + Send + Sync>;

/// Builder for [`OAuth2Authenticator`]
#[derive(Debug)]
pub struct OAuth2AuthenticatorBuilder {
  scope: BaseScope,
  token_endpoint: Url,
  client_id: Option<String>,
  client_secret: Option<String>,
  expiry_margin: TimeDelta,
  http: Option<Client>,
  tokens: TokenState,
}

impl OAuth2AuthenticatorBuilder {
  /// Credentials presented to the token endpoint
  pub fn client_credentials(mut self, credentials: ClientCredentials) -> Self {
    self.client_id = Some(credentials.id);
    self.client_secret = Some(credentials.secret);
    self
  }

  /// Interval before the declared expiry at which a refresh becomes due
  pub fn expiry_margin(mut self, margin: TimeDelta) -> Self {
    self.expiry_margin = margin;
    self
  }

  /// HTTP client used for token endpoint calls
  pub fn http_client(mut self, client: Client) -> Self {
    self.http = Some(client);
    self
  }

  /// Initial token state, e.g. restored from persistent storage
  pub fn tokens(mut self, tokens: TokenState) -> Self {
    self.tokens = tokens;
    self
  }

  pub fn build(self) -> OAuth2Authenticator {
    OAuth2Authenticator {
      scope: self.scope,
      token_endpoint: self.token_endpoint,
      client_id: self.client_id,
      client_secret: self.client_secret,
      expiry_margin: self.expiry_margin,
      http: self.http.unwrap_or_default(),
      state: RwLock::new(self.tokens),
      refresh_gate: AsyncMutex::new(()),
      listeners: Mutex::new(Vec::new()),
      next_listener: AtomicU64::new(0),
    }
  }
}

/// Bearer authenticator that refreshes its access token transparently
pub struct OAuth2Authenticator {
  scope: BaseScope,
  token_endpoint: Url,
  client_id: Option<String>,
  client_secret: Option<String>,
  expiry_margin: TimeDelta,
  http: Client,
  state: RwLock<TokenState>,
  refresh_gate: AsyncMutex<()>,
  listeners: Mutex<Vec<(ListenerId, RefreshListener)>>,
  next_listener: AtomicU64,
}

impl fmt::Debug for OAuth2Authenticator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OAuth2Authenticator")
      .field("scope", &self.scope)
      .field("token_endpoint", &self.token_endpoint)
      .field("client_id", &self.client_id)
      .field("expiry_margin", &self.expiry_margin)
      .field("state", &self.token_state())
      .finish_non_exhaustive()
  }
}

impl OAuth2Authenticator {
  /// Start building an authenticator for requests under `scope`
  pub fn builder(scope: BaseScope, token_endpoint: Url) -> OAuth2AuthenticatorBuilder {
    OAuth2AuthenticatorBuilder {
      scope,
      token_endpoint,
      client_id: None,
      client_secret: None,
      expiry_margin: TimeDelta::seconds(EXPIRY_MARGIN_SECS),
      http: None,
      tokens: TokenState::default(),
    }
  }

  pub fn scope(&self) -> &BaseScope {
    &self.scope
  }

  pub fn token_endpoint(&self) -> &Url {
    &self.token_endpoint
  }

  pub fn client_id(&self) -> Option<&str> {
    self.client_id.as_deref()
  }

  pub fn set_client_id(&mut self, id: impl Into<String>) {
    self.client_id = Some(id.into());
  }

  pub fn set_client_secret(&mut self, secret: impl Into<String>) {
    self.client_secret = Some(secret.into());
  }

  /// Client credentials, if both halves are configured
  pub fn client_credentials(&self) -> Option<ClientCredentials> {
    match (&self.client_id, &self.client_secret) {
      (Some(id), Some(secret)) => Some(ClientCredentials::new(id.as_str(), secret.as_str())),
      _ => None,
    }
  }

  /// Snapshot of the current token state
  pub fn token_state(&self) -> TokenState {
    self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Replace all token fields at once
  pub fn restore(&self, tokens: TokenState) {
    *self.state.write().unwrap_or_else(PoisonError::into_inner) = tokens;
  }

  fn update(&self, apply: impl FnOnce(&mut TokenState)) {
    apply(&mut self.state.write().unwrap_or_else(PoisonError::into_inner));
  }

  pub fn access_token(&self) -> Option<String> {
    self.token_state().access_token
  }

  pub fn set_access_token(&self, token: Option<String>) {
    self.update(|state| state.access_token = token);
  }

  pub fn refresh_token(&self) -> Option<String> {
    self.token_state().refresh_token
  }

  pub fn set_refresh_token(&self, token: Option<String>) {
    self.update(|state| state.refresh_token = token);
  }

  /// Server-declared expiry of the access token
  pub fn expiry(&self) -> Option<DateTime<Utc>> {
    self.token_state().expiry
  }

  pub fn set_expiry(&self, expiry: Option<DateTime<Utc>>) {
    self.update(|state| state.expiry = expiry);
  }

  /// Instant from which the access token is treated as expired
  pub fn effective_expiry(&self) -> Option<DateTime<Utc>> {
    self.expiry().map(|expiry| self.due_at(expiry))
  }

  /// Whether the access token is due for renewal at `now`
  pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
    self.is_due(&self.token_state(), now)
  }

  fn is_due(&self, state: &TokenState, now: DateTime<Utc>) -> bool {
    state.expiry.is_some_and(|expiry| now >= self.due_at(expiry))
  }

  // An expiry too close to the calendar bounds to apply the margin is due at once.
  fn due_at(&self, expiry: DateTime<Utc>) -> DateTime<Utc> {
    expiry
      .checked_sub_signed(self.expiry_margin)
      .unwrap_or(DateTime::<Utc>::MIN_UTC)
  }

  /// Register a callback run after every committed refresh
  pub fn add_refresh_listener<F>(&self, listener: F) -> ListenerId
  where
    F: Fn(&TokenState) + Send + Sync + 'static,
  {
    let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
    self
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push((id, Arc::new(listener)));
    id
  }

  /// Unregister a callback; returns whether it was registered
  pub fn remove_refresh_listener(&self, id: ListenerId) -> bool {
    let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
    let before = listeners.len();
    listeners.retain(|(registered, _)| *registered != id);
    listeners.len() != before
  }

  fn notify_refreshed(&self, state: &TokenState) {
    // Listeners run without the lock held so they may unregister themselves.
    let listeners: Vec<RefreshListener> = self
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .map(|(_, listener)| Arc::clone(listener))
      .collect();

    for listener in listeners {
      listener(state);
    }
  }

  /// Renew the access token now, regardless of its expiry.
  ///
  /// Returns `None` without contacting the token endpoint when no refresh
  /// token is stored.
  pub async fn refresh(&self) -> Result<Option<TokenState>> {
    let _gate = self.refresh_gate.lock().await;
    match self.refresh_token() {
      Some(refresh_token) => self.refresh_locked(&refresh_token).await.map(Some),
      None => Ok(None),
    }
  }

  /// Obtain tokens with the resource owner password grant
  #[instrument(skip(self, password), level = "debug")]
  pub async fn login(&self, username: &str, password: &str) -> Result<TokenState> {
    let _gate = self.refresh_gate.lock().await;
    let response = self
      .request_token(&[("grant_type", "password"), ("username", username), ("password", password)])
      .await?;

    let state = response.into_state(Utc::now(), None)?;
    self.restore(state.clone());
    info!("Obtained access token for {}", username);
    Ok(state)
  }

  /// Forget all tokens
  pub fn logout(&self) {
    self.restore(TokenState::default());
    debug!("Cleared stored tokens");
  }

  /// Refresh if still due once the gate is held; returns the token to use
  async fn refresh_if_due(&self) -> Result<Option<String>> {
    let _gate = self.refresh_gate.lock().await;
    let state = self.token_state();

    match state.refresh_token.as_deref() {
      Some(refresh_token) if self.is_due(&state, Utc::now()) => {
        Ok(self.refresh_locked(refresh_token).await?.access_token)
      }
      _ => {
        debug!("Access token was renewed by a concurrent request");
        Ok(state.access_token)
      }
    }
  }

  /// Run the refresh grant; the caller must hold the refresh gate
  #[instrument(skip_all, level = "debug")]
  async fn refresh_locked(&self, refresh_token: &str) -> Result<TokenState> {
    let state = self
      .request_token(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
      .await
      .and_then(|response| response.into_state(Utc::now(), Some(refresh_token.to_string())))
      .inspect_err(|e| warn!("Token refresh failed: {}", e))?;

    self.restore(state.clone());
    info!("Refreshed access token, expiry {:?}", state.expiry);

    self.notify_refreshed(&state);
    Ok(state)
  }

  /// POST a form to the token endpoint and parse the whole response.
  ///
  /// Nothing is committed here, so a failure leaves the state untouched.
  async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
    let credentials = self.client_credentials().ok_or(Error::MissingClientCredentials)?;
    let fetcher = HttpFetcher::with_decorator(
      self.http.clone(),
      Scoped::new(BaseScope::new(self.token_endpoint.clone()), credentials),
    );

    let request = self
      .http
      .post(self.token_endpoint.clone())
      .header(header::ACCEPT, ACCEPT)
      .header(header::USER_AGENT, USER_AGENT)
      .form(form)
      .build()?;

    let response = fetcher.fetch(request).await?;
    serde_json::from_value(response.body).map_err(Error::TokenResponse)
  }
}

impl CredentialSupplier for OAuth2Authenticator {
  async fn authorization(&self) -> Result<Option<HeaderValue>> {
    let state = self.token_state();
    let Some(access_token) = state.access_token.as_deref() else {
      return Ok(None);
    };

    if !self.is_due(&state, Utc::now()) {
      return bearer_authorization(access_token).map(Some);
    }
    if state.refresh_token.is_none() {
      debug!("Access token has expired and no refresh token is stored");
      return bearer_authorization(access_token).map(Some);
    }

    match self.refresh_if_due().await? {
      Some(access_token) => bearer_authorization(&access_token).map(Some),
      None => Ok(None),
    }
  }
}

impl RequestDecorator for OAuth2Authenticator {
  async fn decorate(&self, request: Request) -> Result<Request> {
    self.scope.apply(self, request).await
  }
}
