use std::fs;

use bkt_api::{BitbucketClient, ClientConfig, TokenState};
use bkt_test_utils::tokens::{TOKEN_PATH, token_response};
use bkt_test_utils::{PageServer, init_tracing};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct Repository {
  slug: String,
}

fn client_for(server: &PageServer) -> anyhow::Result<BitbucketClient> {
  let config = ClientConfig {
    api_base: format!("{}/2.0", server.uri()),
    token_endpoint: format!("{}{}", server.uri(), TOKEN_PATH),
    client_id: Some("abc".to_string()),
    client_secret: Some("xyz".to_string()),
    ..ClientConfig::default()
  };
  Ok(BitbucketClient::new(&config)?)
}

/// Log in, page through a protected collection, and refresh halfway through
/// when the access token expires. Refreshed tokens are persisted by a
/// listener and can be restored into a new client.
#[tokio::test]
async fn test_login_paginate_and_refresh() -> anyhow::Result<()> {
  init_tracing();
  let server = PageServer::start().await;
  let temp_dir = TempDir::new()?;
  let token_file = temp_dir.path().join("tokens.json");

  Mock::given(method("POST"))
    .and(path(TOKEN_PATH))
    .and(header("authorization", "Basic YWJjOnh5eg=="))
    .and(body_string("grant_type=password&username=alice&password=s3cret"))
    .respond_with(ResponseTemplate::new(200).set_body_json(token_response("a1", Some("r1"), Some(3600))))
    .expect(1)
    .mount(server.server())
    .await;

  Mock::given(method("POST"))
    .and(path(TOKEN_PATH))
    .and(body_string("grant_type=refresh_token&refresh_token=r1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(token_response("a2", None, Some(3600))))
    .expect(1)
    .mount(server.server())
    .await;

  // Page 1 only accepts the first token, page 2 only the refreshed one
  let page_two = server.page_url("2.0/repositories/alice", 2);
  Mock::given(method("GET"))
    .and(path("/2.0/repositories/alice"))
    .and(header("authorization", "Bearer a1"))
    .and(query_param_is_missing("page"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "values": [{ "slug": "one" }, { "slug": "two" }],
      "next": page_two,
    })))
    .expect(1)
    .mount(server.server())
    .await;
  Mock::given(method("GET"))
    .and(path("/2.0/repositories/alice"))
    .and(header("authorization", "Bearer a2"))
    .and(query_param("page", "2"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": [{ "slug": "three" }] })))
    .expect(1)
    .mount(server.server())
    .await;

  let client = client_for(&server)?;
  let persisted = token_file.clone();
  client.on_token_refresh(move |state| {
    if let Ok(json) = serde_json::to_string(state) {
      let _ = fs::write(&persisted, json);
    }
  });

  client.login("alice", "s3cret").await?;
  assert!(!token_file.exists());

  let mut repositories = client.paginate::<Repository, _>(&["repositories", "alice"])?;
  assert_eq!(repositories.get(0).await?.slug, "one");

  client.authenticator().set_expiry(Some(DateTime::UNIX_EPOCH));

  assert_eq!(repositories.get(2).await?.slug, "three");
  assert_eq!(repositories.size().await?, 3);
  assert_eq!(repositories.pages_fetched(), 2);

  let saved: TokenState = serde_json::from_str(&fs::read_to_string(&token_file)?)?;
  assert_eq!(saved.access_token.as_deref(), Some("a2"));
  assert_eq!(saved.refresh_token.as_deref(), Some("r1"));
  assert_eq!(saved, client.token_state());

  let restored = client_for(&server)?;
  restored.restore_tokens(saved.clone());
  assert_eq!(restored.token_state(), saved);

  Ok(())
}

/// Protected collections propagate authorization failures
#[tokio::test]
async fn test_unauthorized_page_propagates() -> anyhow::Result<()> {
  let server = PageServer::start().await;

  Mock::given(method("GET"))
    .and(path("/2.0/repositories/alice"))
    .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
    .mount(server.server())
    .await;

  let client = client_for(&server)?;
  let mut repositories = client.paginate::<Repository, _>(&["repositories", "alice"])?;

  let err = repositories.get(0).await.unwrap_err();
  assert_eq!(err.status(), Some(reqwest::StatusCode::FORBIDDEN));
  assert_eq!(repositories.pages_fetched(), 0);

  Ok(())
}
