use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::filters::DEFAULT_PER_PAGE;

const API_URL_VAR: &str = "FLIGHTDESK_API_URL";
const PASSWORD_VAR: &str = "FLIGHTDESK_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Page size used when a query string does not name one
  #[serde(default = "default_per_page")]
  pub per_page: u32,
  /// Where the bearer token is kept (defaults to the data directory)
  pub token_file: Option<PathBuf>,
  /// Refetch cached reads older than this even without a write
  pub stale_after_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
}

fn default_per_page() -> u32 {
  DEFAULT_PER_PAGE
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./flightdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/flightdesk/config.yaml
  ///
  /// `FLIGHTDESK_API_URL` overrides `api.url`, and is enough on its own
  /// when no file exists.
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

    let env_url = std::env::var(API_URL_VAR).ok().filter(|u| !u.is_empty());
    let config = match (path, env_url.clone()) {
      (Some(p), _) => Self::load_from_path(&p)?,
      (None, Some(url)) => Self::from_url(url),
      (None, None) => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/flightdesk/config.yaml\n\
                 or set {}.",
          API_URL_VAR
        ))
      }
    };

    Ok(config.with_url_override(env_url))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("flightdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("flightdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.per_page == 0 {
      return Err(eyre!("per_page must be at least 1"));
    }
    Ok(config)
  }

  fn from_url(url: String) -> Self {
    Self {
      api: ApiConfig { url },
      per_page: DEFAULT_PER_PAGE,
      token_file: None,
      stale_after_secs: None,
    }
  }

  fn with_url_override(mut self, url: Option<String>) -> Self {
    if let Some(url) = url {
      self.api.url = url;
    }
    self
  }

  /// Get the login password from the environment, if set.
  ///
  /// Checks FLIGHTDESK_PASSWORD.
  pub fn get_password() -> Option<String> {
    std::env::var(PASSWORD_VAR).ok().filter(|p| !p.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full() {
    let config = Config::parse(
      "api:\n  url: https://flights.example.com/api\nper_page: 25\ntoken_file: /tmp/fd-token\nstale_after_secs: 60\n",
    )
    .unwrap();
    assert_eq!(config.api.url, "https://flights.example.com/api");
    assert_eq!(config.per_page, 25);
    assert_eq!(config.token_file, Some(PathBuf::from("/tmp/fd-token")));
    assert_eq!(config.stale_after_secs, Some(60));
  }

  #[test]
  fn test_parse_defaults() {
    let config = Config::parse("api:\n  url: http://localhost:8080\n").unwrap();
    assert_eq!(config.per_page, DEFAULT_PER_PAGE);
    assert!(config.token_file.is_none());
    assert!(config.stale_after_secs.is_none());
  }

  #[test]
  fn test_parse_rejects_zero_page_size() {
    assert!(Config::parse("api:\n  url: http://x\nper_page: 0\n").is_err());
  }

  #[test]
  fn test_parse_requires_api() {
    assert!(Config::parse("per_page: 10\n").is_err());
  }

  #[test]
  fn test_url_override() {
    let config = Config::from_url("http://a".into()).with_url_override(Some("http://b".into()));
    assert_eq!(config.api.url, "http://b");
    let config = Config::from_url("http://a".into()).with_url_override(None);
    assert_eq!(config.api.url, "http://a");
  }

  #[test]
  fn test_missing_explicit_path() {
    assert!(Config::load(Some(Path::new("/nonexistent/flightdesk.yaml"))).is_err());
  }

  #[test]
  fn test_load_from_path() {
    let path = std::env::temp_dir().join(format!("flightdesk-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "api:\n  url: http://file\n").unwrap();
    let config = Config::load_from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(config.api.url, "http://file");
  }
}
