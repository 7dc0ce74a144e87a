use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::client::{ApiFetcher, BitbucketClient};
use crate::error::{Error, Result};
use crate::fetcher::ResourceFetcher;
use crate::pagination::PaginatedView;

impl BitbucketClient {
  /// URL of the resource at `segments` beneath the API root.
  ///
  /// Each segment is percent-encoded, so slugs containing `/` or spaces stay
  /// a single path component.
  pub fn resource_url<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url> {
    let mut url = self.base_url.clone();
    if segments.is_empty() {
      return Ok(url);
    }
    url
      .path_segments_mut()
      .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
      .pop_if_empty()
      .extend(segments.iter().map(AsRef::as_ref));
    Ok(url)
  }

  /// GET a JSON document, or `None` if the server answers 404
  #[instrument(skip(self), fields(url = %url), level = "debug")]
  pub async fn get(&self, url: Url) -> Result<Option<Value>> {
    match self.fetcher.get_json(url).await {
      Ok(response) => Ok(Some(response.body)),
      Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
        debug!("Resource not found");
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }

  /// GET the resource at `segments` beneath the API root
  pub async fn get_resource<S: AsRef<str>>(&self, segments: &[S]) -> Result<Option<Value>> {
    let url = self.resource_url(segments)?;
    self.get(url).await
  }

  /// GET the resource at `segments` and deserialize it
  pub async fn get_resource_as<T, S>(&self, segments: &[S]) -> Result<Option<T>>
  where
    T: DeserializeOwned,
    S: AsRef<str>,
  {
    self
      .get_resource(segments)
      .await?
      .map(|value| serde_json::from_value(value).map_err(Error::Decode))
      .transpose()
  }

  /// Lazy view over the paginated collection at `segments`
  pub fn paginate<T, S>(&self, segments: &[S]) -> Result<PaginatedView<T, ApiFetcher>>
  where
    T: DeserializeOwned + 'static,
    S: AsRef<str>,
  {
    let url = self.resource_url(segments)?;
    Ok(PaginatedView::new(self.fetcher.clone(), url))
  }

  /// Lazy view over the collection whose first page is `first_page`, with
  /// items built by `factory`
  pub fn paginate_with<T, G>(&self, first_page: Url, factory: G) -> PaginatedView<T, ApiFetcher>
  where
    G: Fn(&Value) -> Result<T> + Send + Sync + 'static,
  {
    PaginatedView::with_factory(self.fetcher.clone(), first_page, factory)
  }
}
