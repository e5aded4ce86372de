//! Offline cache for the application shell and API responses.
//!
//! One versioned bucket of URL→response pairs with the three lifecycle
//! steps of a browser cache worker:
//! - install: eagerly fetch and store the application shell
//! - fetch: network-first for the API host, cache-first for everything else
//! - activate: delete every bucket not matching the current version

mod storage;
mod worker;

pub use storage::{CacheEntry, CacheStore, CachedResponse, SqliteStore};
pub use worker::{CacheWorker, Fetch, FetchResult, FetchSource, HttpFetcher};
