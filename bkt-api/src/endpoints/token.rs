use tracing::instrument;

use crate::auth::ListenerId;
use crate::client::BitbucketClient;
use crate::error::Result;
use crate::models::TokenState;

impl BitbucketClient {
  /// Obtain tokens for a Bitbucket account with the password grant
  #[instrument(skip(self, password), level = "debug")]
  pub async fn login(&self, username: &str, password: &str) -> Result<TokenState> {
    self.authenticator.login(username, password).await
  }

  /// Forget the stored tokens
  pub fn logout(&self) {
    self.authenticator.logout();
  }

  /// Snapshot of the current tokens, e.g. for persisting between runs
  pub fn token_state(&self) -> TokenState {
    self.authenticator.token_state()
  }

  pub fn restore_tokens(&self, tokens: TokenState) {
    self.authenticator.restore(tokens);
  }

  /// Call `listener` with the new tokens after every refresh
  pub fn on_token_refresh<F>(&self, listener: F) -> ListenerId
  where
    F: Fn(&TokenState) + Send + Sync + 'static,
  {
    self.authenticator.add_refresh_listener(listener)
  }
}
