use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variables checked for the API credential, in order.
const API_KEY_VARS: [&str; 2] = ["DARTDASH_API_KEY", "DART_API_KEY"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub relay: RelayConfig,
  /// Corporation code pre-filled in search forms
  pub default_corp_code: Option<String>,
  /// File the config was read from; `None` when running on defaults
  #[serde(skip)]
  pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Base URL the operation paths are appended to
  pub base_url: String,
  pub timeout_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "https://opendart.fss.or.kr/api".to_string(),
      timeout_ms: 10_000,
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }

  /// Host shown in the header, e.g. `opendart.fss.or.kr`.
  pub fn host(&self) -> String {
    Url::parse(&self.base_url)
      .ok()
      .and_then(|url| url.host_str().map(String::from))
      .unwrap_or_else(|| self.base_url.clone())
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// When false, every lookup misses and results are never stored
  pub enabled: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { enabled: true }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
  pub port: u16,
  /// Host that `/api/*` is forwarded to
  pub upstream: String,
  /// Origins allowed by CORS
  pub allowed_origins: Vec<String>,
}

impl Default for RelayConfig {
  fn default() -> Self {
    Self {
      port: 8080,
      upstream: "https://opendart.fss.or.kr".to_string(),
      allowed_origins: vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
      ],
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./dartdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/dartdash/config.yaml
  /// 4. Built-in defaults
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

    let config = match path {
      Some(p) => Config {
        source: Some(p.clone()),
        ..Self::load_from_path(&p)?
      },
      None => Config::default(),
    };

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("dartdash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("dartdash").join("config.yaml");
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

  fn validate(&self) -> Result<()> {
    let url = Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url {:?}: {}", self.api.base_url, e))?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!("api.base_url must be http or https: {}", self.api.base_url));
    }

    Url::parse(&self.relay.upstream)
      .map_err(|e| eyre!("Invalid relay.upstream {:?}: {}", self.relay.upstream, e))?;

    if self.api.timeout_ms == 0 {
      return Err(eyre!("api.timeout_ms must be greater than zero"));
    }

    Ok(())
  }

  /// Get the DART API key from environment variables.
  ///
  /// Checks DARTDASH_API_KEY first, then DART_API_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    Self::api_key_from(|name| std::env::var(name).ok())
  }

  fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    API_KEY_VARS
      .into_iter()
      .filter_map(lookup)
      .find(|value| !value.trim().is_empty())
      .ok_or_else(|| {
        eyre!("DART API key not found. Set DARTDASH_API_KEY or DART_API_KEY environment variable.")
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
  }

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "https://opendart.fss.or.kr/api");
    assert_eq!(config.api.timeout(), Duration::from_secs(10));
    assert!(config.cache.enabled);
    assert_eq!(config.relay.port, 8080);
    assert_eq!(config.relay.allowed_origins.len(), 2);
    assert_eq!(config.api.host(), "opendart.fss.or.kr");
    assert_eq!(config.source, None);
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let file = write_config(
      "api:\n  timeout_ms: 2500\ncache:\n  enabled: false\ndefault_corp_code: \"00126380\"\n",
    );
    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.api.timeout_ms, 2500);
    assert_eq!(config.api.base_url, "https://opendart.fss.or.kr/api");
    assert!(!config.cache.enabled);
    assert_eq!(config.relay.port, 8080);
    assert_eq!(config.default_corp_code.as_deref(), Some("00126380"));
    assert_eq!(config.source.as_deref(), Some(file.path()));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/dartdash.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_invalid_base_url_is_rejected() {
    let file = write_config("api:\n  base_url: \"not a url\"\n");
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("api.base_url"));
  }

  #[test]
  fn test_relay_section() {
    let file = write_config(
      "relay:\n  port: 9090\n  allowed_origins:\n    - \"http://localhost:5173\"\n",
    );
    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.relay.port, 9090);
    assert_eq!(config.relay.allowed_origins, vec!["http://localhost:5173"]);
    assert_eq!(config.relay.upstream, "https://opendart.fss.or.kr");
  }

  #[test]
  fn test_api_key_lookup_order() {
    let both = |name: &str| match name {
      "DARTDASH_API_KEY" => Some("primary".to_string()),
      "DART_API_KEY" => Some("fallback".to_string()),
      _ => None,
    };
    assert_eq!(Config::api_key_from(both).unwrap(), "primary");

    let fallback_only = |name: &str| (name == "DART_API_KEY").then(|| "fallback".to_string());
    assert_eq!(Config::api_key_from(fallback_only).unwrap(), "fallback");

    let blank = |_: &str| Some("  ".to_string());
    assert!(Config::api_key_from(blank).is_err());
  }
}
