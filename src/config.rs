use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `api.url`
pub const API_URL_ENV: &str = "CATALOG_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub view: ViewConfig,
  #[serde(default)]
  pub limits: LimitsConfig,
  #[serde(default)]
  pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_api_url")]
  pub url: String,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_api_url() -> String {
  "http://localhost:3001".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
  #[serde(default = "default_page_size")]
  pub page_size: usize,
  #[serde(default = "default_page_size_options")]
  pub page_size_options: Vec<usize>,
  /// Fetch limit used until the user picks one
  #[serde(default = "default_fetch_limit")]
  pub default_fetch_limit: u32,
}

impl Default for ViewConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
      page_size_options: default_page_size_options(),
      default_fetch_limit: default_fetch_limit(),
    }
  }
}

fn default_page_size() -> usize {
  10
}

fn default_page_size_options() -> Vec<usize> {
  vec![5, 10, 20, 50]
}

fn default_fetch_limit() -> u32 {
  1000
}

/// Deployment caps applied on top of user-chosen limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
  /// Most records a list window may hold
  #[serde(default = "default_view_hard_cap")]
  pub view_hard_cap: u32,
  /// Most records one export may contain
  #[serde(default = "default_export_hard_cap")]
  pub export_hard_cap: u32,
  /// Records requested per page while exporting
  #[serde(default = "default_export_chunk_size")]
  pub export_chunk_size: u32,
}

impl Default for LimitsConfig {
  fn default() -> Self {
    Self {
      view_hard_cap: default_view_hard_cap(),
      export_hard_cap: default_export_hard_cap(),
      export_chunk_size: default_export_chunk_size(),
    }
  }
}

fn default_view_hard_cap() -> u32 {
  10_000
}

fn default_export_hard_cap() -> u32 {
  100_000
}

fn default_export_chunk_size() -> u32 {
  1_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: String,
  /// SQLite file; defaults to `catalog.db` in the data directory
  pub database: Option<PathBuf>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: default_bind(),
      database: None,
    }
  }
}

fn default_bind() -> String {
  "127.0.0.1:3001".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./catalog.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/catalog/config.yaml
  ///
  /// With no file found the defaults are used. `CATALOG_API_URL` overrides
  /// the API URL either way.
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
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      if !url.trim().is_empty() {
        config.api.url = url;
      }
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("catalog.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("catalog").join("config.yaml");
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

  fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  fn validate(&self) -> Result<()> {
    if self.view.page_size == 0 {
      return Err(eyre!("view.page_size must be positive"));
    }
    if self.view.page_size_options.contains(&0) {
      return Err(eyre!("view.page_size_options must all be positive"));
    }
    if self.view.default_fetch_limit == 0 {
      return Err(eyre!("view.default_fetch_limit must be positive"));
    }
    if self.limits.view_hard_cap == 0 || self.limits.export_hard_cap == 0 {
      return Err(eyre!("limits must be positive"));
    }
    if self.limits.export_chunk_size == 0 {
      return Err(eyre!("limits.export_chunk_size must be positive"));
    }
    Ok(())
  }

  /// Directory for the preference store, log files and the server database
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("catalog"))
  }

  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.server.database {
      Some(path) => Ok(path.clone()),
      None => Ok(Self::data_dir()?.join("catalog.db")),
    }
  }

  /// Header title: the configured one, else the API host
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.url)
      .ok()
      .and_then(|u| {
        u.host_str().map(|h| match u.port() {
          Some(port) => format!("{}:{}", h, port),
          None => h.to_string(),
        })
      })
      .unwrap_or_else(|| self.api.url.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.url, "http://localhost:3001");
    assert_eq!(config.view.page_size, 10);
    assert_eq!(config.view.page_size_options, vec![5, 10, 20, 50]);
    assert_eq!(config.view.default_fetch_limit, 1000);
    assert_eq!(config.limits.view_hard_cap, 10_000);
    assert_eq!(config.limits.export_hard_cap, 100_000);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_partial_yaml_keeps_other_defaults() {
    let config = Config::from_yaml(
      r#"
api:
  url: https://catalog.example.com
limits:
  view_hard_cap: 2000
"#,
    )
    .unwrap();
    assert_eq!(config.api.url, "https://catalog.example.com");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.limits.view_hard_cap, 2000);
    assert_eq!(config.limits.export_hard_cap, 100_000);
    assert_eq!(config.server.bind, "127.0.0.1:3001");
  }

  #[test]
  fn test_empty_yaml_is_default() {
    let config = Config::from_yaml("\n").unwrap();
    assert_eq!(config.view.page_size, 10);
  }

  #[test]
  fn test_validate_rejects_zero_limits() {
    let config = Config::from_yaml("view:\n  default_fetch_limit: 0\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_explicit_missing_path_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    assert!(Config::load(Some(&missing)).is_err());
  }

  #[test]
  fn test_display_title() {
    let mut config = Config::default();
    assert_eq!(config.display_title(), "localhost:3001");
    config.title = Some("Shop admin".to_string());
    assert_eq!(config.display_title(), "Shop admin");
  }
}
