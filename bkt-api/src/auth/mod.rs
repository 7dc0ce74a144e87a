//! # Authentication
//!
//! Request decoration by composition: a [`BaseScope`] decides whether a
//! request is eligible, and a [`CredentialSupplier`] provides the
//! `Authorization` header value. [`OAuth2Authenticator`] is the supplier that
//! keeps its access token fresh through the refresh grant.

pub mod credentials;
pub mod oauth2;
pub mod scope;

pub use credentials::{BearerToken, CredentialSupplier, basic_authorization, bearer_authorization};
pub use oauth2::{ListenerId, OAuth2Authenticator, OAuth2AuthenticatorBuilder};
pub use scope::{BaseScope, Scoped};
