//! Client for the WordPress-backed vocabulary API.
//!
//! JWT login, deck fetching, progress updates, and profile lookup against a
//! single fixed host. Every public operation returns [`ApiResult`] instead
//! of letting an error cross the call boundary.

mod api_types;
mod client;
mod error;
pub mod transport;
mod types;

pub use client::WordPressClient;
pub use error::ApiError;
pub use transport::HttpTransport;
pub use types::{ApiResult, LoginSession, UserProfile, Word};
