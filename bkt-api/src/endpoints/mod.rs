//! # Bitbucket API Endpoints
//!
//! Operations on [`BitbucketClient`](crate::BitbucketClient), split by
//! concern: token lifecycle and generic resource access.

pub mod resources;
pub mod token;
