//! # Resource Fetcher
//!
//! The seam through which every API call flows: an outgoing [`Request`] is
//! passed through a [`RequestDecorator`], sent, and its JSON body decoded.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Request, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::consts::{ACCEPT, USER_AGENT};
use crate::error::{Error, Result};

/// Adds credentials (or anything else) to an outgoing request
pub trait RequestDecorator: Send + Sync {
  /// Return the request to send in place of `request`
  fn decorate(&self, request: Request) -> impl Future<Output = Result<Request>> + Send;
}

/// Decorator that sends requests unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl RequestDecorator for NoAuth {
  async fn decorate(&self, request: Request) -> Result<Request> {
    Ok(request)
  }
}

impl<D: RequestDecorator> RequestDecorator for Arc<D> {
  fn decorate(&self, request: Request) -> impl Future<Output = Result<Request>> + Send {
    (**self).decorate(request)
  }
}

/// Status, headers and decoded body of a successful response
#[derive(Debug, Clone)]
pub struct FetchResponse {
  pub status: StatusCode,
  pub headers: HeaderMap,
  /// `Value::Null` when the response had no body
  pub body: Value,
}

/// Issues requests and decodes their JSON responses
pub trait ResourceFetcher: Send + Sync {
  /// Send `request` and decode the response.
  ///
  /// Non-2xx statuses are reported as [`Error::Status`].
  fn fetch(&self, request: Request) -> impl Future<Output = Result<FetchResponse>> + Send;

  /// GET a JSON resource
  fn get_json(&self, url: Url) -> impl Future<Output = Result<FetchResponse>> + Send {
    self.fetch(json_request(Method::GET, url))
  }
}

impl<F: ResourceFetcher> ResourceFetcher for &F {
  fn fetch(&self, request: Request) -> impl Future<Output = Result<FetchResponse>> + Send {
    (**self).fetch(request)
  }
}

/// Build a request carrying the default `Accept` and `User-Agent` headers
pub fn json_request(method: Method, url: Url) -> Request {
  let mut request = Request::new(method, url);
  let headers = request.headers_mut();
  headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
  headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
  request
}

/// [`ResourceFetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher<D = NoAuth> {
  client: Client,
  decorator: D,
}

impl HttpFetcher {
  /// Create a fetcher that sends requests without credentials
  pub fn new() -> Self {
    Self::with_decorator(Client::new(), NoAuth)
  }
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self::new()
  }
}

impl<D: RequestDecorator> HttpFetcher<D> {
  /// Create a fetcher that passes every request through `decorator`
  pub fn with_decorator(client: Client, decorator: D) -> Self {
    Self { client, decorator }
  }

  /// The decorator applied to outgoing requests
  pub fn decorator(&self) -> &D {
    &self.decorator
  }
}

impl<D: RequestDecorator> ResourceFetcher for HttpFetcher<D> {
  #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()), level = "debug")]
  async fn fetch(&self, request: Request) -> Result<FetchResponse> {
    let request = self.decorator.decorate(request).await?;
    let url = request.url().clone();

    let response = self.client.execute(request).await?;
    let status = response.status();
    debug!("API response status: {}", status);

    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!("Unexpected API error: HTTP {} - {}", status, body);
      return Err(Error::Status { status, url, body });
    }

    let headers = response.headers().clone();
    let bytes = response.bytes().await?;
    let body = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).map_err(Error::Decode)?
    };
    trace!("Response body: {}", body);

    Ok(FetchResponse { status, headers, body })
  }
}
