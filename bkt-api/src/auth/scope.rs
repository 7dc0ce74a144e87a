//! URI prefix scoping for request decoration.

use reqwest::Request;
use reqwest::header::AUTHORIZATION;
use tracing::trace;
use url::Url;

use crate::auth::credentials::CredentialSupplier;
use crate::error::Result;
use crate::fetcher::RequestDecorator;

/// Absolute URI prefix under which credentials are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseScope {
  prefix: Url,
}

impl BaseScope {
  /// Create a scope from an absolute URL prefix
  pub fn new(prefix: Url) -> Self {
    Self { prefix }
  }

  /// Parse a scope from a string
  pub fn parse(prefix: &str) -> Result<Self> {
    Ok(Self::new(Url::parse(prefix)?))
  }

  /// The prefix URL
  pub fn as_url(&self) -> &Url {
    &self.prefix
  }

  /// Whether `url` falls under this scope (case-sensitive prefix match)
  pub fn contains(&self, url: &Url) -> bool {
    url.as_str().starts_with(self.prefix.as_str())
  }

  /// Attach the header from `supplier` if the request targets this scope.
  ///
  /// Requests outside the scope are returned untouched and the supplier is
  /// not consulted.
  pub async fn apply<S: CredentialSupplier>(&self, supplier: &S, mut request: Request) -> Result<Request> {
    if !self.contains(request.url()) {
      trace!("{} is outside {}, sending without credentials", request.url(), self.prefix);
      return Ok(request);
    }

    if let Some(value) = supplier.authorization().await? {
      request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
  }
}

/// A credential supplier restricted to a [`BaseScope`]
#[derive(Debug, Clone)]
pub struct Scoped<S> {
  scope: BaseScope,
  supplier: S,
}

impl<S: CredentialSupplier> Scoped<S> {
  pub fn new(scope: BaseScope, supplier: S) -> Self {
    Self { scope, supplier }
  }

  pub fn scope(&self) -> &BaseScope {
    &self.scope
  }

  pub fn supplier(&self) -> &S {
    &self.supplier
  }
}

impl<S: CredentialSupplier> RequestDecorator for Scoped<S> {
  async fn decorate(&self, request: Request) -> Result<Request> {
    self.scope.apply(&self.supplier, request).await
  }
}
