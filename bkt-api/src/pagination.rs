//! # Paginated Collections
//!
//! A lazy, randomly indexable view over a cursor-paginated collection. Pages
//! are fetched strictly in cursor order and only as far as a request needs;
//! a fetched page is cached for the lifetime of the view and never fetched
//! again.
//!
//! Views take `&mut self` for every operation that may fetch, so a view is
//! used from one task at a time. Share a view across tasks by wrapping it in
//! a `tokio::sync::Mutex`.

use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::consts::{PAGE_NEXT_KEY, PAGE_VALUES_KEY};
use crate::error::{Error, Result};
use crate::fetcher::ResourceFetcher;

/// One fetched segment of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
  items: Vec<Value>,
  next: Option<Url>,
}

impl Page {
  /// Decode a page response fetched from `url`.
  ///
  /// The `values` array is required. `next` may be absent or null, which
  /// marks the last page.
  pub fn from_json(url: &Url, body: Value) -> Result<Self> {
    let Value::Object(mut object) = body else {
      return Err(malformed(url, "response is not a JSON object"));
    };

    let items = match object.remove(PAGE_VALUES_KEY) {
      Some(Value::Array(items)) => items,
      Some(_) => return Err(malformed(url, "`values` is not an array")),
      None => return Err(malformed(url, "missing `values` array")),
    };

    let next = match object.remove(PAGE_NEXT_KEY) {
      None | Some(Value::Null) => None,
      Some(Value::String(next)) => Some(
        url
          .join(&next)
          .map_err(|e| malformed(url, &format!("invalid `next` link '{next}': {e}")))?,
      ),
      Some(_) => return Err(malformed(url, "`next` is not a string")),
    };

    Ok(Self { items, next })
  }

  pub fn items(&self) -> &[Value] {
    &self.items
  }

  /// Link to the following page, if any
  pub fn next(&self) -> Option<&Url> {
    self.next.as_ref()
  }
}

fn malformed(url: &Url, reason: &str) -> Error {
  Error::MalformedPage {
    url: url.clone(),
    reason: reason.to_string(),
  }
}

type ItemFactory<T> = Box<dyn Fn(&Value) -> Result<T> + Send + Sync>;

/// Random-access view over a remote paginated collection
pub struct PaginatedView<T, F> {
  fetcher: F,
  factory: ItemFactory<T>,
  pages: Vec<Page>,
  /// Index of the first item of each page
  offsets: Vec<usize>,
  len: usize,
  cursor: Option<Url>,
  /// URLs of the pages fetched so far
  visited: HashSet<Url>,
}

impl<T, F> fmt::Debug for PaginatedView<T, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PaginatedView")
      .field("pages", &self.pages.len())
      .field("len", &self.len)
      .field("cursor", &self.cursor)
      .finish_non_exhaustive()
  }
}

fn deserialize_item<T: DeserializeOwned>(value: &Value) -> Result<T> {
  T::deserialize(value).map_err(Error::Decode)
}

impl<T: DeserializeOwned + 'static, F: ResourceFetcher> PaginatedView<T, F> {
  /// Create a view whose items are deserialized with serde
  pub fn new(fetcher: F, first_page: Url) -> Self {
    Self::with_factory(fetcher, first_page, deserialize_item::<T>)
  }
}

impl<T, F: ResourceFetcher> PaginatedView<T, F> {
  /// Create a view that turns raw items into `T` with `factory`
  pub fn with_factory<G>(fetcher: F, first_page: Url, factory: G) -> Self
  where
    G: Fn(&Value) -> Result<T> + Send + Sync + 'static,
  {
    Self {
      fetcher,
      factory: Box::new(factory),
      pages: Vec::new(),
      offsets: Vec::new(),
      len: 0,
      cursor: Some(first_page),
      visited: HashSet::new(),
    }
  }

  /// Item at `index`, fetching pages until it is covered.
  ///
  /// Fails with [`Error::IndexOutOfRange`] once the collection is exhausted
  /// without reaching `index`.
  #[instrument(skip(self), level = "debug")]
  pub async fn get(&mut self, index: usize) -> Result<T> {
    while index >= self.len && self.cursor.is_some() {
      self.fetch_next().await?;
    }

    let item = self
      .cached(index)
      .ok_or(Error::IndexOutOfRange { index, len: self.len })?;
    (self.factory)(item)
  }

  /// Total number of items; exhausts pagination on first call
  #[instrument(skip(self), level = "debug")]
  pub async fn size(&mut self) -> Result<usize> {
    while self.cursor.is_some() {
      self.fetch_next().await?;
    }
    Ok(self.len)
  }

  /// Decode every item of the collection in order
  pub async fn collect(&mut self) -> Result<Vec<T>> {
    self.size().await?;
    self
      .pages
      .iter()
      .flat_map(|page| page.items.iter())
      .map(|item| (self.factory)(item))
      .collect()
  }

  /// Number of items fetched so far
  pub fn cached_len(&self) -> usize {
    self.len
  }

  /// Pages fetched so far, in fetch order
  pub fn pages(&self) -> &[Page] {
    &self.pages
  }

  pub fn pages_fetched(&self) -> usize {
    self.pages.len()
  }

  /// Whether the last page has been fetched
  pub fn is_exhausted(&self) -> bool {
    self.cursor.is_none()
  }

  fn cached(&self, index: usize) -> Option<&Value> {
    // Last page starting at or before `index`. Empty pages share their start
    // with the following page and sort before it.
    let page = self.offsets.partition_point(|&start| start <= index).checked_sub(1)?;
    self.pages[page].items.get(index - self.offsets[page])
  }

  async fn fetch_next(&mut self) -> Result<()> {
    let Some(url) = self.cursor.clone() else {
      return Ok(());
    };

    debug!("Fetching page {} from {}", self.pages.len() + 1, url);
    let response = self.fetcher.get_json(url.clone()).await?;
    let page = Page::from_json(&url, response.body)?;
    trace!("Page has {} items, next: {:?}", page.items.len(), page.next);

    if let Some(next) = &page.next {
      if *next == url || self.visited.contains(next) {
        return Err(malformed(&url, &format!("`next` link {next} points to an already fetched page")));
      }
    }

    self.visited.insert(url);
    self.offsets.push(self.len);
    self.len += page.items.len();
    self.cursor = page.next.clone();
    self.pages.push(page);
    Ok(())
  }
}
