//! Typed failure taxonomy for the API client.

use thiserror::Error;

use super::transport::TransportError;

/// Everything that can go wrong beneath a public client operation.
///
/// Public operations never surface these directly; they convert them into
/// [`super::types::ApiResult`] failures at their own boundary.
#[derive(Error, Debug)]
pub enum ApiError {
  /// Operation requires a logged-in session. No request was made.
  #[error("You must log in first")]
  NotLoggedIn,

  /// Progress update invoked without a word id. No request was made.
  #[error("Word id is required")]
  MissingWordId,

  /// The server answered 401. The stored token has already been cleared.
  #[error("Session expired. Please log in again")]
  SessionExpired,

  /// The validation endpoint answered, but not with a valid-token code.
  #[error("Token is no longer valid")]
  InvalidToken,

  /// Any other non-2xx response, with the server's message when it sent one.
  #[error("{message}")]
  Api { status: u16, message: String },

  #[error(transparent)]
  Transport(#[from] TransportError),

  #[error("Malformed response body: {0}")]
  Decode(#[from] serde_json::Error),
}
