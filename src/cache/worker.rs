//! Offline cache worker: the install / fetch / activate lifecycle.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::storage::{CacheStore, CachedResponse};

/// Network side of the worker. A trait so tests can script it.
#[async_trait]
pub trait Fetch: Send + Sync {
  async fn fetch(&self, url: &str) -> Result<CachedResponse>;
}

/// Production fetcher backed by `reqwest`.
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Fetch for HttpFetcher {
  async fn fetch(&self, url: &str) -> Result<CachedResponse> {
    let response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Fetch failed for {}: {}", url, e))?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body from {}: {}", url, e))?
      .to_vec();

    Ok(CachedResponse {
      status,
      content_type,
      body,
    })
  }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
  Network,
  Cache,
}

/// Response plus its provenance.
#[derive(Debug, Clone)]
pub struct FetchResult {
  pub response: CachedResponse,
  pub source: FetchSource,
}

/// Serves intercepted requests from one versioned bucket.
///
/// Requests to the API host go network-first with a cache fallback;
/// everything else goes cache-first. Bumping the version string and
/// activating invalidates every older bucket.
pub struct CacheWorker<S: CacheStore, F: Fetch> {
  store: Arc<S>,
  fetcher: F,
  /// Current bucket name.
  version: String,
  /// Requests to this host are served network-first.
  api_host: String,
  /// Origin the shell assets are fetched from at install.
  origin: String,
  /// Root-relative shell asset paths.
  shell: Vec<String>,
}

impl<S: CacheStore, F: Fetch> CacheWorker<S, F> {
  pub fn new(
    store: Arc<S>,
    fetcher: F,
    version: impl Into<String>,
    api_host: impl Into<String>,
  ) -> Self {
    Self {
      store,
      fetcher,
      version: version.into(),
      api_host: api_host.into(),
      origin: String::new(),
      shell: Vec::new(),
    }
  }

  /// Set the application shell to pre-cache at install.
  pub fn with_shell(mut self, origin: impl Into<String>, shell: Vec<String>) -> Self {
    self.origin = origin.into();
    self.shell = shell;
    self
  }

  /// Pre-populate the current bucket with the application shell.
  ///
  /// All-or-nothing: the first failed fetch aborts the install and nothing
  /// is written.
  pub async fn install(&self) -> Result<()> {
    let fetches = self.shell.iter().map(|path| {
      let url = format!("{}{}", self.origin, path);
      async move {
        let response = self.fetcher.fetch(&url).await?;
        Ok::<_, color_eyre::Report>((url, response))
      }
    });

    let responses = try_join_all(fetches).await?;

    for (url, response) in &responses {
      self.store.put(&self.version, url, response)?;
    }

    info!(
      bucket = %self.version,
      assets = responses.len(),
      "installed application shell"
    );
    Ok(())
  }

  /// Serve one intercepted request.
  pub async fn handle_fetch(&self, url: &str) -> Result<FetchResult> {
    if self.is_api_request(url) {
      self.network_first(url).await
    } else {
      self.cache_first(url).await
    }
  }

  /// Delete every bucket that is not the current version.
  pub fn activate(&self) -> Result<()> {
    for bucket in self.store.buckets()? {
      if bucket != self.version {
        info!(%bucket, "pruning stale cache bucket");
        self.store.delete_bucket(&bucket)?;
      }
    }
    Ok(())
  }

  fn is_api_request(&self, url: &str) -> bool {
    Url::parse(url)
      .ok()
      .and_then(|u| u.host_str().map(|h| h == self.api_host))
      .unwrap_or(false)
  }

  /// Network wins; a successful response is copied into the bucket. On
  /// network failure, fall back to whatever was last cached for this URL.
  async fn network_first(&self, url: &str) -> Result<FetchResult> {
    match self.fetcher.fetch(url).await {
      Ok(response) => {
        self.store.put(&self.version, url, &response)?;
        Ok(FetchResult {
          response,
          source: FetchSource::Network,
        })
      }
      Err(err) => {
        if let Some(entry) = self.store.get(&self.version, url)? {
          debug!(%url, "network failed, serving cached response");
          return Ok(FetchResult {
            response: entry.response,
            source: FetchSource::Cache,
          });
        }
        Err(err)
      }
    }
  }

  /// Cache wins; a miss goes to the network without caching the result.
  async fn cache_first(&self, url: &str) -> Result<FetchResult> {
    if let Some(entry) = self.store.get(&self.version, url)? {
      return Ok(FetchResult {
        response: entry.response,
        source: FetchSource::Cache,
      });
    }

    let response = self.fetcher.fetch(url).await?;
    Ok(FetchResult {
      response,
      source: FetchSource::Network,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::SqliteStore;
  use std::collections::HashMap;
  use std::sync::Mutex;

  const VERSION: &str = "kelime-ogren-v2";
  const API_HOST: &str = "kelime.kayacuneyt.com";
  const ORIGIN: &str = "https://kelime.kayacuneyt.com";

  /// Fetcher double: a fixed URL→response table, or fully offline.
  struct FakeFetch {
    responses: HashMap<String, CachedResponse>,
    down: bool,
    calls: Mutex<Vec<String>>,
  }

  impl FakeFetch {
    fn serving(entries: &[(&str, &str)]) -> Self {
      let responses = entries
        .iter()
        .map(|(url, body)| (url.to_string(), response(body)))
        .collect();
      Self {
        responses,
        down: false,
        calls: Mutex::new(Vec::new()),
      }
    }

    fn down() -> Self {
      Self {
        responses: HashMap::new(),
        down: true,
        calls: Mutex::new(Vec::new()),
      }
    }

    fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl Fetch for FakeFetch {
    async fn fetch(&self, url: &str) -> Result<CachedResponse> {
      self.calls.lock().unwrap().push(url.to_string());
      if self.down {
        return Err(eyre!("network unreachable"));
      }
      self
        .responses
        .get(url)
        .cloned()
        .ok_or_else(|| eyre!("no route to {}", url))
    }
  }

  fn response(body: &str) -> CachedResponse {
    CachedResponse {
      status: 200,
      content_type: Some("text/html".to_string()),
      body: body.as_bytes().to_vec(),
    }
  }

  fn worker(fetcher: FakeFetch) -> (Arc<SqliteStore>, CacheWorker<SqliteStore, FakeFetch>) {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let worker = CacheWorker::new(Arc::clone(&store), fetcher, VERSION, API_HOST);
    (store, worker)
  }

  #[tokio::test]
  async fn test_install_populates_shell() {
    let fetcher = FakeFetch::serving(&[
      ("https://kelime.kayacuneyt.com/", "index"),
      ("https://kelime.kayacuneyt.com/login", "login"),
      ("https://kelime.kayacuneyt.com/manifest.json", "{}"),
    ]);
    let (store, worker) = worker(fetcher);
    let worker = worker.with_shell(
      ORIGIN,
      vec!["/".into(), "/login".into(), "/manifest.json".into()],
    );

    worker.install().await.unwrap();

    for url in [
      "https://kelime.kayacuneyt.com/",
      "https://kelime.kayacuneyt.com/login",
      "https://kelime.kayacuneyt.com/manifest.json",
    ] {
      assert!(store.get(VERSION, url).unwrap().is_some(), "missing {}", url);
    }
  }

  #[tokio::test]
  async fn test_install_aborts_when_an_asset_fails() {
    let fetcher = FakeFetch::serving(&[("https://kelime.kayacuneyt.com/", "index")]);
    let (store, worker) = worker(fetcher);
    let worker = worker.with_shell(ORIGIN, vec!["/".into(), "/missing.png".into()]);

    assert!(worker.install().await.is_err());

    // All-or-nothing: nothing was written
    assert!(store.buckets().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_activate_prunes_stale_buckets() {
    let (store, worker) = worker(FakeFetch::down());
    store.put("kelime-ogren-v1", "https://x/", &response("old")).unwrap();
    store.put(VERSION, "https://x/", &response("current")).unwrap();
    store.put("other", "https://y/", &response("other")).unwrap();

    worker.activate().unwrap();

    assert_eq!(store.buckets().unwrap(), vec![VERSION]);
  }

  #[tokio::test]
  async fn test_api_request_is_network_first_and_cached() {
    let url = "https://kelime.kayacuneyt.com/wp-json/kelime/v1/deck";
    let fetcher = FakeFetch::serving(&[(url, "[]")]);
    let (store, worker) = worker(fetcher);

    let result = worker.handle_fetch(url).await.unwrap();

    assert_eq!(result.source, FetchSource::Network);
    assert_eq!(result.response.status, 200);
    assert_eq!(result.response.content_type.as_deref(), Some("text/html"));
    assert_eq!(result.response.body, b"[]".to_vec());

    let entry = store.get(VERSION, url).unwrap().unwrap();
    assert_eq!(entry.response.body, b"[]".to_vec());
  }

  #[tokio::test]
  async fn test_api_request_falls_back_to_cache_when_offline() {
    let url = "https://kelime.kayacuneyt.com/wp-json/kelime/v1/deck";
    let (store, worker) = worker(FakeFetch::down());
    store.put(VERSION, url, &response("cached deck")).unwrap();

    let result = worker.handle_fetch(url).await.unwrap();

    assert_eq!(result.source, FetchSource::Cache);
    assert_eq!(result.response.body, b"cached deck".to_vec());
  }

  #[tokio::test]
  async fn test_api_request_offline_without_cache_fails() {
    let (_store, worker) = worker(FakeFetch::down());

    let result = worker
      .handle_fetch("https://kelime.kayacuneyt.com/wp-json/kelime/v1/deck")
      .await;

    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_static_request_cache_first_skips_network() {
    let url = "https://cdn.example.com/app.css";
    let (store, worker) = worker(FakeFetch::down());
    store.put(VERSION, url, &response("body{}")).unwrap();

    let result = worker.handle_fetch(url).await.unwrap();

    assert_eq!(result.source, FetchSource::Cache);
    assert_eq!(worker.fetcher.call_count(), 0);
  }

  #[tokio::test]
  async fn test_static_request_miss_fetches_without_caching() {
    let url = "https://cdn.example.com/app.css";
    let fetcher = FakeFetch::serving(&[(url, "body{}")]);
    let (store, worker) = worker(fetcher);

    let result = worker.handle_fetch(url).await.unwrap();

    assert_eq!(result.source, FetchSource::Network);
    // Cache-first misses are not written back
    assert!(store.get(VERSION, url).unwrap().is_none());
  }
}
