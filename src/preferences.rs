//! User preferences kept in the cache service's preferences slot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  Light,
  Dark,
  /// Follow the system setting
  #[default]
  System,
}

impl fmt::Display for Theme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Theme::Light => "light",
      Theme::Dark => "dark",
      Theme::System => "system",
    };
    f.pad(s)
  }
}

impl FromStr for Theme {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "light" => Ok(Theme::Light),
      "dark" => Ok(Theme::Dark),
      "system" => Ok(Theme::System),
      other => Err(format!("unknown theme: {}", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
  pub theme: Theme,
  pub notifications: bool,
}

impl Default for UserPreferences {
  fn default() -> Self {
    Self {
      theme: Theme::System,
      notifications: true,
    }
  }
}
