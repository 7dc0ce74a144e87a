//! # Bitbucket API Client
//!
//! Bitbucket Cloud REST client built around two pieces: an OAuth2
//! authenticator that renews its access token before protected requests, and
//! a lazy, randomly indexable view over cursor-paginated collections.

pub mod auth;
pub mod client;
pub mod config;
pub mod consts;
pub mod endpoints;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod pagination;

// Re-export the client
pub use client::{ApiFetcher, BitbucketClient, create_bitbucket_client};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use fetcher::{FetchResponse, HttpFetcher, NoAuth, RequestDecorator, ResourceFetcher};
// Re-export models
pub use models::{ClientCredentials, TokenState};
pub use pagination::{Page, PaginatedView};
