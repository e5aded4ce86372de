//! WordPress REST API client with JWT session handling.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::session::TokenStore;

use super::api_types::{ApiDeckResponse, ApiErrorBody, ApiTokenResponse, ApiValidateResponse};
use super::error::ApiError;
use super::transport::{HttpRequest, Method, Transport};
use super::types::{ApiResult, LoginSession, UserProfile, Word};

/// Code the validation endpoint returns for a token that is still good.
const VALID_TOKEN_CODE: &str = "jwt_auth_valid_token";

/// Client for the vocabulary service's WordPress backend.
///
/// Holds the bearer token for the current session, mirrored between memory
/// and the [`TokenStore`]. Construct one explicitly and pass it around;
/// there is no global instance.
pub struct WordPressClient<T: Transport, S: TokenStore> {
  base_url: String,
  transport: T,
  store: S,
  /// In-memory mirror of the persisted token.
  token: Mutex<Option<String>>,
}

impl<T: Transport, S: TokenStore> WordPressClient<T, S> {
  /// Create a client, picking up any previously persisted token.
  pub fn new(base_url: impl Into<String>, transport: T, store: S) -> Self {
    let token = store.get();
    Self {
      base_url: base_url.into(),
      transport,
      store,
      token: Mutex::new(token),
    }
  }

  /// Log in with username and password, persisting the granted token.
  ///
  /// A 2xx answer without a token field counts as a refused grant and
  /// leaves the logged-out state untouched.
  pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginSession> {
    let body = json!({ "username": username, "password": password });

    let response: Result<ApiTokenResponse, ApiError> = self
      .request(Method::Post, "/jwt-auth/v1/token", Some(body), &[])
      .await;

    match response {
      Ok(ApiTokenResponse {
        token: Some(token),
        user,
        ..
      }) => {
        self.set_token(&token);
        debug!("login succeeded, token stored");
        ApiResult::success(LoginSession { token, user }, "Login successful")
      }
      Ok(ApiTokenResponse { message, .. }) => {
        ApiResult::failure(message.unwrap_or_else(|| "No token in response".to_string()))
      }
      Err(e) => ApiResult::failure(e.to_string()),
    }
  }

  /// Drop the session. Never touches the network and never fails.
  pub fn logout(&self) {
    self.clear_token();
  }

  pub fn is_logged_in(&self) -> bool {
    self.current_token().is_some()
  }

  /// Fetch the current study deck.
  pub async fn get_deck(&self) -> ApiResult<Vec<Word>> {
    if !self.is_logged_in() {
      return ApiResult::failure(ApiError::NotLoggedIn.to_string());
    }

    match self
      .request::<ApiDeckResponse>(Method::Get, "/kelime/v1/deck", None, &[])
      .await
    {
      Ok(deck) => ApiResult::success(deck.into_words(), "Deck fetched"),
      Err(e) => ApiResult::failure(e.to_string()),
    }
  }

  /// Record whether the learner knew a word. The success payload is
  /// whatever JSON the server chooses to answer with.
  pub async fn update_progress(&self, word_id: &str, known: bool) -> ApiResult<Value> {
    if !self.is_logged_in() {
      return ApiResult::failure(ApiError::NotLoggedIn.to_string());
    }
    if word_id.is_empty() {
      return ApiResult::failure(ApiError::MissingWordId.to_string());
    }

    let body = json!({ "word_id": word_id, "known": known });

    match self
      .request::<Value>(Method::Post, "/kelime/v1/progress", Some(body), &[])
      .await
    {
      Ok(data) => ApiResult::success(data, "Progress saved"),
      Err(e) => ApiResult::failure(e.to_string()),
    }
  }

  /// Fetch the logged-in user's profile.
  pub async fn get_user_profile(&self) -> ApiResult<UserProfile> {
    if !self.is_logged_in() {
      return ApiResult::failure(ApiError::NotLoggedIn.to_string());
    }

    match self
      .request::<UserProfile>(Method::Get, "/wp/v2/users/me", None, &[])
      .await
    {
      Ok(user) => ApiResult::success(user, "Profile fetched"),
      Err(e) => ApiResult::failure(e.to_string()),
    }
  }

  /// Check the held token against the validation endpoint.
  ///
  /// Anything other than a well-formed valid-token answer clears the
  /// session.
  pub async fn refresh_token(&self) -> ApiResult<()> {
    if !self.is_logged_in() {
      return ApiResult::failure(ApiError::NotLoggedIn.to_string());
    }

    match self
      .request::<ApiValidateResponse>(Method::Post, "/jwt-auth/v1/token/validate", None, &[])
      .await
    {
      Ok(response) if response.code == VALID_TOKEN_CODE => {
        ApiResult::success((), "Token valid")
      }
      Ok(_) => {
        self.clear_token();
        ApiResult::failure(ApiError::InvalidToken.to_string())
      }
      Err(e) => {
        self.clear_token();
        ApiResult::failure(e.to_string())
      }
    }
  }

  /// Shared request pipeline beneath every public operation: build the URL,
  /// build headers, send, classify the status, parse the body.
  ///
  /// Errors come back typed; converting them into [`ApiResult`] is the
  /// calling operation's job.
  async fn request<R: DeserializeOwned>(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<Value>,
    extra_headers: &[(&str, &str)],
  ) -> Result<R, ApiError> {
    let url = format!("{}{}", self.base_url, endpoint);
    let headers = self.build_headers(extra_headers);

    let request = HttpRequest {
      method,
      url,
      headers,
      body: body.map(|b| b.to_string()),
    };

    let response = self.transport.send(request).await?;

    // An expired session is decided on status alone, before the body.
    if response.status == 401 {
      warn!("received 401 from {}, clearing stored token", endpoint);
      self.clear_token();
      return Err(ApiError::SessionExpired);
    }

    if !response.is_success() {
      let message = serde_json::from_str::<ApiErrorBody>(&response.body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("HTTP Error: {}", response.status));
      return Err(ApiError::Api {
        status: response.status,
        message,
      });
    }

    Ok(serde_json::from_str(&response.body)?)
  }

  /// Default headers, then the bearer token, then caller extras.
  /// Extras win on conflict.
  fn build_headers(&self, extra: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = vec![(
      "Content-Type".to_string(),
      "application/json".to_string(),
    )];

    if let Some(token) = self.current_token() {
      headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
    }

    for (name, value) in extra {
      headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
      headers.push((name.to_string(), value.to_string()));
    }

    headers
  }

  fn current_token(&self) -> Option<String> {
    self.token.lock().ok().and_then(|t| t.clone())
  }

  /// Persist a token and mirror it in memory.
  fn set_token(&self, token: &str) {
    self.store.set(token);
    if let Ok(mut held) = self.token.lock() {
      *held = Some(token.to_string());
    }
  }

  /// Clear both the persisted and the in-memory token. Idempotent.
  fn clear_token(&self) {
    self.store.clear();
    if let Ok(mut held) = self.token.lock() {
      *held = None;
    }
  }
}
