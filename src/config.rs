use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub remote: RemoteConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub detail: DetailConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  pub base_url: String,
  /// List endpoint, queried with `page` and `limit`
  #[serde(default = "default_list_path")]
  pub list_path: String,
  /// Single-record endpoint; `{id}` is replaced by the record id
  #[serde(default = "default_detail_path")]
  pub detail_path: String,
  /// Search endpoint, queried with `q`, `page` and `limit`
  #[serde(default = "default_search_path")]
  pub search_path: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default = "default_per_page")]
  pub per_page: u32,
}

impl RemoteConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Database location (default: $XDG_DATA_HOME/fetchwise/cache.db)
  pub path: Option<PathBuf>,
  /// Age after which a cached page no longer counts as available; 0 keeps pages forever
  #[serde(default = "default_max_age_secs")]
  pub max_age_secs: u64,
  /// Write remote list results into the cache
  #[serde(default = "default_true")]
  pub insert_to_cache: bool,
  /// Answer remote list fetches with a cache re-read after the write
  #[serde(default)]
  pub force_reload_from_cache: bool,
}

impl CacheConfig {
  pub fn max_age(&self) -> Option<chrono::Duration> {
    match self.max_age_secs {
      0 => None,
      secs => Some(chrono::Duration::seconds(secs as i64)),
    }
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: None,
      max_age_secs: default_max_age_secs(),
      insert_to_cache: true,
      force_reload_from_cache: false,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailConfig {
  /// Always fetch single records from the remote
  #[serde(default)]
  pub force_reload: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Also write daily rolling log files here
  pub dir: Option<PathBuf>,
}

fn default_list_path() -> String {
  "/records".to_string()
}

fn default_detail_path() -> String {
  "/records/{id}".to_string()
}

fn default_search_path() -> String {
  "/search".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_per_page() -> u32 {
  20
}

fn default_max_age_secs() -> u64 {
  300
}

fn default_true() -> bool {
  true
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fetchwise.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fetchwise/config.yaml
  ///
  /// `FETCHWISE_BASE_URL` overrides `remote.base_url`.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/fetchwise/config.yaml"
        ))
      }
    };

    if let Ok(base_url) = std::env::var("FETCHWISE_BASE_URL") {
      config.remote.base_url = base_url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fetchwise.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fetchwise").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }
}
