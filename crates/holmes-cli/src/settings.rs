//! Layered configuration: an optional TOML file overridden by `HOLMES_*`
//! environment variables.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// How many reviews `review last` returns when no limit is given.
  #[serde(default = "default_last_reviews_limit")]
  pub last_reviews_limit: usize,
  /// Usage snapshot keyed by `limit-for-<url>`, loaded into the in-process
  /// counter.
  #[serde(default)]
  pub usage:              HashMap<String, u64>,
}

fn default_store_path() -> PathBuf { PathBuf::from("holmes.db") }

fn default_last_reviews_limit() -> usize { 12 }

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let cfg = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("HOLMES"))
      .build()
      .context("failed to read config file")?;
    Self::from_config(cfg)
  }

  fn from_config(cfg: config::Config) -> anyhow::Result<Self> {
    let mut settings: Settings = cfg
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn from_toml(raw: &str) -> Settings {
    let cfg = Config::builder()
      .add_source(File::from_str(raw, FileFormat::Toml))
      .build()
      .unwrap();
    Settings::from_config(cfg).unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let s = from_toml("");
    assert_eq!(s.store_path, PathBuf::from("holmes.db"));
    assert_eq!(s.last_reviews_limit, 12);
    assert!(s.usage.is_empty());
  }

  #[test]
  fn file_values_are_read() {
    let s = from_toml(
      r#"
      store_path = "/var/lib/holmes/reviews.db"
      last_reviews_limit = 5

      [usage]
      "limit-for-http://example.com" = 7
      "#,
    );
    assert_eq!(s.store_path, PathBuf::from("/var/lib/holmes/reviews.db"));
    assert_eq!(s.last_reviews_limit, 5);
    assert_eq!(s.usage["limit-for-http://example.com"], 7);
  }

  #[test]
  fn relative_paths_are_left_alone() {
    assert_eq!(expand_tilde(Path::new("data/holmes.db")), PathBuf::from("data/holmes.db"));
  }
}
