//! Serde-deserializable types matching WordPress API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::{UserProfile, Word};

/// Response from the JWT token endpoint. A 2xx answer without a `token`
/// field still counts as a refused grant.
#[derive(Debug, Deserialize)]
pub struct ApiTokenResponse {
  pub token: Option<String>,
  pub user: Option<UserProfile>,
  pub message: Option<String>,
}

/// Response from the token validation endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiValidateResponse {
  #[serde(default)]
  pub code: String,
}

/// The deck endpoint has historically answered with either a bare array or
/// a wrapped object; both shapes stay accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiDeckResponse {
  Wrapped { words: Vec<Word> },
  Bare(Vec<Word>),
}

impl ApiDeckResponse {
  pub fn into_words(self) -> Vec<Word> {
    match self {
      Self::Wrapped { words } => words,
      Self::Bare(words) => words,
    }
  }
}

/// Error body shape for non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
}
