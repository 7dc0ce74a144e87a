//! Test utilities shared across the bkt workspace
//!
//! This crate provides common testing infrastructure including:
//! - Mock paginated collections ([`PageServer`])
//! - Token endpoint response bodies ([`tokens`])
//! - Environment variable isolation ([`EnvVarGuard`])
//! - Log output for tests ([`init_tracing`])
//!
//! The clippy dead_code lint is disabled for this crate because test utilities
//! may not be used by all tests, and the compiler cannot detect usage across
//! crate boundaries in development dependencies.

#![allow(dead_code)]

pub mod env;
pub mod logging;
pub mod pages;
pub mod tokens;

// Re-export commonly used items
pub use env::EnvVarGuard;
pub use logging::init_tracing;
pub use pages::PageServer;
