//! Environment variable management for testing
//!
//! Tests that read configuration from the environment override variables
//! through [`EnvVarGuard`] so the original value is restored afterwards.

use std::env;

/// Saves an environment variable and restores it when dropped
pub struct EnvVarGuard {
  key: String,
  /// The original value, if any
  original: Option<String>,
}

impl EnvVarGuard {
  /// Capture the current value of `key`
  pub fn new(key: &str) -> Self {
    Self {
      key: key.to_string(),
      original: env::var(key).ok(),
    }
  }

  /// Capture `key` and set it to `value`
  pub fn set_to(key: &str, value: &str) -> Self {
    let guard = Self::new(key);
    guard.set(value);
    guard
  }

  /// Set the variable for the lifetime of the guard
  pub fn set(&self, value: &str) {
    unsafe {
      env::set_var(&self.key, value);
    }
  }

  /// Remove the variable for the lifetime of the guard
  pub fn remove(&self) {
    unsafe {
      env::remove_var(&self.key);
    }
  }
}

impl Drop for EnvVarGuard {
  fn drop(&mut self) {
    // Restore original environment variable
    match &self.original {
      Some(val) => unsafe {
        env::set_var(&self.key, val);
      },
      None => unsafe {
        env::remove_var(&self.key);
      },
    }
  }
}
