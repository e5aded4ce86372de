use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the REST API, e.g. https://kelime.kayacuneyt.com/wp-json
  pub url: String,
  /// Host whose requests the cache worker serves network-first
  /// (defaults to the host of `url`)
  pub host: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Current bucket name; bump on deploy to invalidate old caches
  #[serde(default = "default_cache_version")]
  pub version: String,
  /// Origin the shell assets are fetched from
  /// (defaults to the origin of `api.url`)
  pub origin: Option<String>,
  /// Application shell paths pre-cached at install
  #[serde(default = "default_shell")]
  pub shell: Vec<String>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: default_cache_version(),
      origin: None,
      shell: default_shell(),
    }
  }
}

fn default_cache_version() -> String {
  "kelime-ogren-v2".to_string()
}

fn default_shell() -> Vec<String> {
  [
    "/",
    "/login",
    "/manifest.json",
    "/icon.svg",
    "/icon-192.png",
    "/icon-512.png",
  ]
  .into_iter()
  .map(String::from)
  .collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./kelime.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/kelime/config.yaml
  /// 4. ~/.config/kelime/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/kelime/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("kelime.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("kelime").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Host the cache worker treats as API traffic.
  pub fn api_host(&self) -> Result<String> {
    if let Some(host) = &self.api.host {
      return Ok(host.clone());
    }

    let url = Url::parse(&self.api.url)
      .map_err(|e| eyre!("Invalid api.url {}: {}", self.api.url, e))?;
    url
      .host_str()
      .map(String::from)
      .ok_or_else(|| eyre!("api.url {} has no host", self.api.url))
  }

  /// Origin the shell assets are fetched from.
  pub fn cache_origin(&self) -> Result<String> {
    if let Some(origin) = &self.cache.origin {
      return Ok(origin.trim_end_matches('/').to_string());
    }

    let url = Url::parse(&self.api.url)
      .map_err(|e| eyre!("Invalid api.url {}: {}", self.api.url, e))?;
    let host = url
      .host_str()
      .ok_or_else(|| eyre!("api.url {} has no host", self.api.url))?;

    Ok(format!("{}://{}", url.scheme(), host))
  }

  /// Get the login password from the environment.
  ///
  /// Used when the CLI login command is invoked without --password.
  pub fn get_password() -> Result<String> {
    std::env::var("KELIME_PASSWORD")
      .map_err(|_| eyre!("Password not found. Set the KELIME_PASSWORD environment variable."))
  }
}
