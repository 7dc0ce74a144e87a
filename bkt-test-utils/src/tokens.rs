//! Token endpoint fixtures

use serde_json::{Map, Value, json};

/// Path at which tests mount the mock token endpoint
pub const TOKEN_PATH: &str = "/site/oauth2/access_token";

/// Build a token endpoint response body.
///
/// Optional fields are left out entirely when `None`.
pub fn token_response(access_token: &str, refresh_token: Option<&str>, expires_in: Option<i64>) -> Value {
  let mut body = Map::new();
  body.insert("access_token".to_string(), json!(access_token));
  body.insert("token_type".to_string(), json!("bearer"));
  if let Some(refresh_token) = refresh_token {
    body.insert("refresh_token".to_string(), json!(refresh_token));
  }
  if let Some(expires_in) = expires_in {
    body.insert("expires_in".to_string(), json!(expires_in));
  }
  Value::Object(body)
}
