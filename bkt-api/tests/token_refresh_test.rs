use bkt_api::auth::{BaseScope, OAuth2Authenticator};
use bkt_api::{ClientCredentials, RequestDecorator};
use bkt_test_utils::init_tracing;
use bkt_test_utils::tokens::token_response;
use chrono::{DateTime, Utc};
use reqwest::{Method, Request};
use url::Url;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn expired_authenticator(token_endpoint: Url) -> anyhow::Result<OAuth2Authenticator> {
  let authenticator = OAuth2Authenticator::builder(BaseScope::parse("https://api.example.com/2.0/")?, token_endpoint)
    .client_credentials(ClientCredentials::new("abc", "xyz"))
    .build();
  authenticator.set_access_token(Some("stale".to_string()));
  authenticator.set_refresh_token(Some("r1".to_string()));
  authenticator.set_expiry(Some(DateTime::UNIX_EPOCH));
  Ok(authenticator)
}

/// An expired token is renewed before the protected request goes out
#[tokio::test]
async fn test_expired_token_is_refreshed_before_request() -> anyhow::Result<()> {
  init_tracing();
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/oauth/token"))
    .and(header("authorization", "Basic YWJjOnh5eg=="))
    .and(header("content-type", "application/x-www-form-urlencoded"))
    .and(body_string("grant_type=refresh_token&refresh_token=r1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(token_response("a2", Some("r2"), Some(3600))))
    .expect(1)
    .mount(&mock_server)
    .await;

  let authenticator = expired_authenticator(Url::parse(&format!("{}/oauth/token", mock_server.uri()))?)?;

  let before = Utc::now();
  let request = Request::new(Method::GET, Url::parse("https://api.example.com/2.0/user")?);
  let request = authenticator.decorate(request).await?;

  assert_eq!(request.headers()["authorization"], "Bearer a2");
  assert_eq!(authenticator.access_token().as_deref(), Some("a2"));
  assert_eq!(authenticator.refresh_token().as_deref(), Some("r2"));

  let expiry = authenticator.expiry().ok_or_else(|| anyhow::anyhow!("expiry not set"))?;
  assert!(expiry >= before + chrono::TimeDelta::seconds(3600));
  assert!(expiry <= Utc::now() + chrono::TimeDelta::seconds(3600));

  Ok(())
}

/// Requests outside the API root never trigger a refresh
#[tokio::test]
async fn test_out_of_scope_request_does_not_refresh() -> anyhow::Result<()> {
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/oauth/token"))
    .respond_with(ResponseTemplate::new(200).set_body_json(token_response("a2", None, Some(3600))))
    .expect(0)
    .mount(&mock_server)
    .await;

  let authenticator = expired_authenticator(Url::parse(&format!("{}/oauth/token", mock_server.uri()))?)?;

  let request = Request::new(Method::GET, Url::parse("https://cdn.example.com/avatar.png")?);
  let request = authenticator.decorate(request).await?;

  assert!(request.headers().get("authorization").is_none());
  assert_eq!(authenticator.access_token().as_deref(), Some("stale"));

  Ok(())
}

/// A failed refresh surfaces the endpoint error and keeps the old tokens
#[tokio::test]
async fn test_failed_refresh_keeps_previous_tokens() -> anyhow::Result<()> {
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/oauth/token"))
    .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error": "invalid_grant"}"#))
    .expect(1)
    .mount(&mock_server)
    .await;

  let authenticator = expired_authenticator(Url::parse(&format!("{}/oauth/token", mock_server.uri()))?)?;
  let before = authenticator.token_state();

  let request = Request::new(Method::GET, Url::parse("https://api.example.com/2.0/user")?);
  let err = authenticator.decorate(request).await.unwrap_err();

  assert_eq!(err.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
  assert_eq!(authenticator.token_state(), before);

  Ok(())
}
