//! Domain types for the vocabulary service.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single vocabulary word from the study deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
  #[serde(default)]
  pub id: u64,
  #[serde(default)]
  pub word: String,
  #[serde(default)]
  pub meaning: String,
  // The deck endpoint's field set is not fully pinned down; keep whatever
  // else the server sends.
  #[serde(flatten)]
  pub extra: HashMap<String, Value>,
}

/// User object as returned by the login and profile endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(default)]
  pub id: u64,
  #[serde(default)]
  pub name: String,
  #[serde(flatten)]
  pub extra: HashMap<String, Value>,
}

/// Token plus user identity granted by a successful login.
#[derive(Debug, Clone)]
pub struct LoginSession {
  pub token: String,
  pub user: Option<UserProfile>,
}

/// Uniform outcome of every public client operation.
///
/// Either variant carries a human-readable message suitable for showing to
/// the user as-is.
#[derive(Debug, Clone)]
pub enum ApiResult<T> {
  Success { data: T, message: String },
  Failure { message: String },
}

impl<T> ApiResult<T> {
  pub fn success(data: T, message: impl Into<String>) -> Self {
    Self::Success {
      data,
      message: message.into(),
    }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self::Failure {
      message: message.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, Self::Success { .. })
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Success { message, .. } => message,
      Self::Failure { message } => message,
    }
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      Self::Success { data, .. } => Some(data),
      Self::Failure { .. } => None,
    }
  }

  pub fn into_data(self) -> Option<T> {
    match self {
      Self::Success { data, .. } => Some(data),
      Self::Failure { .. } => None,
    }
  }
}
