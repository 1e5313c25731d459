//! Store configuration: which driver to use and where the data lives.

use serde::Deserialize;

use crate::{Error, Result};

/// Drivers this backend answers to.
pub const SUPPORTED_DRIVERS: &[&str] = &["sqlite3", "sqlite"];

/// Connection settings, usually deserialised from the `[database]` table of
/// the process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  pub driver: String,
  /// Anything SQLite accepts as a filename: a path, a `file:` URI or
  /// `:memory:`.
  pub dsn:    String,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      driver: "sqlite3".to_owned(),
      dsn:    "file:incidents.db".to_owned(),
    }
  }
}

impl StoreConfig {
  pub fn validate(&self) -> Result<()> {
    if SUPPORTED_DRIVERS.contains(&self.driver.as_str()) {
      Ok(())
    } else {
      Err(Error::UnsupportedDriver(self.driver.clone()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_to_local_sqlite_file() {
    let cfg = StoreConfig::default();
    assert_eq!(cfg.driver, "sqlite3");
    assert_eq!(cfg.dsn, "file:incidents.db");
    assert!(cfg.validate().is_ok());
  }

  #[test]
  fn missing_fields_take_defaults() {
    let cfg: StoreConfig =
      serde_json::from_str(r#"{ "dsn": ":memory:" }"#).unwrap();
    assert_eq!(cfg.driver, "sqlite3");
    assert_eq!(cfg.dsn, ":memory:");
  }

  #[test]
  fn other_drivers_are_rejected() {
    let cfg = StoreConfig { driver: "postgres".into(), ..Default::default() };
    assert!(matches!(cfg.validate(), Err(Error::UnsupportedDriver(d)) if d == "postgres"));
  }
}
