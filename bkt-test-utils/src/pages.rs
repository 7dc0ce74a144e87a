//! Mock server for cursor-paginated collections
//!
//! [`PageServer`] serves a fixed sequence of pages in the Bitbucket
//! `{"values": [...], "next": "..."}` shape and records which pages were
//! requested, so tests can assert how many fetches happened and in what
//! order.

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a page response body
pub fn page_body(values: Vec<Value>, next: Option<&str>) -> Value {
  let pagelen = values.len();
  match next {
    Some(next) => json!({ "values": values, "next": next, "pagelen": pagelen }),
    None => json!({ "values": values, "pagelen": pagelen }),
  }
}

/// Path and query of the 1-based page `number` of `collection`
pub fn page_path(collection: &str, number: usize) -> String {
  if number <= 1 {
    format!("/{collection}")
  } else {
    format!("/{collection}?page={number}")
  }
}

/// A [`MockServer`] serving paginated collections
pub struct PageServer {
  server: MockServer,
}

impl PageServer {
  /// Start a new mock server
  pub async fn start() -> Self {
    Self {
      server: MockServer::start().await,
    }
  }

  /// The underlying mock server, for mounting extra mocks
  pub fn server(&self) -> &MockServer {
    &self.server
  }

  pub fn uri(&self) -> String {
    self.server.uri()
  }

  /// URL of the first page of `collection`
  pub fn collection_url(&self, collection: &str) -> String {
    format!("{}/{}", self.server.uri(), collection)
  }

  /// URL of the 1-based page `number` of `collection`
  pub fn page_url(&self, collection: &str, number: usize) -> String {
    format!("{}{}", self.server.uri(), page_path(collection, number))
  }

  /// Serve `pages` as `collection`, each page linking to the following one
  pub async fn mount_pages(&self, collection: &str, pages: &[Vec<Value>]) {
    let collection_path = format!("/{collection}");

    for (index, values) in pages.iter().enumerate() {
      let number = index + 1;
      let next = (number < pages.len()).then(|| self.page_url(collection, number + 1));
      let response = ResponseTemplate::new(200).set_body_json(page_body(values.clone(), next.as_deref()));

      let mock = Mock::given(method("GET")).and(path(collection_path.as_str()));
      let mock = if number == 1 {
        mock.and(query_param_is_missing("page"))
      } else {
        mock.and(query_param("page", number.to_string()))
      };
      mock.respond_with(response).mount(&self.server).await;
    }
  }

  /// Path and query of all requests received so far, in arrival order.
  ///
  /// The recorded host differs from [`MockServer::uri`], so compare these
  /// against [`page_path`] rather than full URLs.
  pub async fn fetched_paths(&self) -> Vec<String> {
    self
      .server
      .received_requests()
      .await
      .unwrap_or_default()
      .iter()
      .map(|request| match request.url.query() {
        Some(query) => format!("{}?{}", request.url.path(), query),
        None => request.url.path().to_string(),
      })
      .collect()
  }

  /// Number of requests received so far
  pub async fn fetch_count(&self) -> usize {
    self.fetched_paths().await.len()
  }
}
