use chrono::Duration;
use color_eyre::{eyre::eyre, Result};

/// Key layout and expiry policy of the cache service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
  /// Prefix shared by every expiring cache entry
  pub prefix: String,
  /// TTL used when a write doesn't specify one
  pub default_ttl: Duration,
  pub favorites_key: String,
  pub watchlist_key: String,
  pub preferences_key: String,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      prefix: "ipo_cache_".to_string(),
      default_ttl: Duration::minutes(5),
      favorites_key: "favorite_ipos".to_string(),
      watchlist_key: "watchlist_ipos".to_string(),
      preferences_key: "user_preferences".to_string(),
    }
  }
}

impl CacheSettings {
  /// Check that the fixed keys live outside the cache namespace and don't clash.
  ///
  /// A fixed key under the prefix would be wiped by `clear_cache`.
  pub fn validate(&self) -> Result<()> {
    if self.prefix.is_empty() {
      return Err(eyre!("Cache prefix must not be empty"));
    }
    if self.default_ttl <= Duration::zero() {
      return Err(eyre!("Default cache TTL must be positive"));
    }

    let fixed = [
      ("favorites", &self.favorites_key),
      ("watchlist", &self.watchlist_key),
      ("preferences", &self.preferences_key),
    ];

    for (name, key) in fixed {
      if key.is_empty() {
        return Err(eyre!("The {} key must not be empty", name));
      }
      if key.starts_with(&self.prefix) {
        return Err(eyre!(
          "The {} key '{}' falls inside the cache prefix '{}'",
          name,
          key,
          self.prefix
        ));
      }
    }

    for (i, (a_name, a)) in fixed.iter().enumerate() {
      for (b_name, b) in &fixed[i + 1..] {
        if a == b {
          return Err(eyre!("The {} and {} keys are both '{}'", a_name, b_name, a));
        }
      }
    }

    Ok(())
  }
}
