use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::CacheSettings;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
  /// Database file (defaults to $XDG_DATA_HOME/ipo-cache/store.db)
  pub path: Option<PathBuf>,
  /// When false nothing is persisted and every read misses
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      path: None,
      enabled: true,
    }
  }
}

fn default_true() -> bool {
  true
}

/// Overrides for [`CacheSettings`]; unset fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  pub prefix: Option<String>,
  pub default_ttl_secs: Option<u64>,
  pub favorites_key: Option<String>,
  pub watchlist_key: Option<String>,
  pub preferences_key: Option<String>,
}

impl CacheConfig {
  /// Resolve into validated cache settings.
  pub fn settings(&self) -> Result<CacheSettings> {
    let defaults = CacheSettings::default();

    let default_ttl = match self.default_ttl_secs {
      Some(secs) => {
        let secs = i64::try_from(secs).map_err(|_| eyre!("default_ttl_secs is too large"))?;
        Duration::try_seconds(secs).ok_or_else(|| eyre!("default_ttl_secs is out of range"))?
      }
      None => defaults.default_ttl,
    };

    let settings = CacheSettings {
      prefix: self.prefix.clone().unwrap_or(defaults.prefix),
      default_ttl,
      favorites_key: self.favorites_key.clone().unwrap_or(defaults.favorites_key),
      watchlist_key: self.watchlist_key.clone().unwrap_or(defaults.watchlist_key),
      preferences_key: self
        .preferences_key
        .clone()
        .unwrap_or(defaults.preferences_key),
    };
    settings.validate()?;

    Ok(settings)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ipo-cache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ipo-cache/config.yaml
  ///
  /// With no file found the defaults are used.
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
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("ipo-cache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ipo-cache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = Config::parse("{}").unwrap();

    assert!(config.storage.enabled);
    assert!(config.storage.path.is_none());
    assert_eq!(config.cache.settings().unwrap(), CacheSettings::default());
  }

  #[test]
  fn test_overrides() {
    let config = Config::parse(
      r#"
storage:
  path: /tmp/ipo.db
  enabled: false
cache:
  prefix: "listing_"
  default_ttl_secs: 60
  favorites_key: "favs"
"#,
    )
    .unwrap();

    assert!(!config.storage.enabled);
    assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/ipo.db")));

    let settings = config.cache.settings().unwrap();
    assert_eq!(settings.prefix, "listing_");
    assert_eq!(settings.default_ttl, Duration::seconds(60));
    assert_eq!(settings.favorites_key, "favs");
    assert_eq!(settings.watchlist_key, "watchlist_ipos");
  }

  #[test]
  fn test_fixed_key_inside_prefix_is_an_error() {
    let config = Config::parse(
      r#"
cache:
  prefix: "fav"
"#,
    )
    .unwrap();

    assert!(config.cache.settings().is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/ipo-cache.yaml"))).is_err());
  }
}
