//! Error type for `saferplace-store-sqlite`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("incident {0:?} already exists")]
  AlreadyExists(String),

  #[error("incident {0:?} does not exist")]
  IncidentNotFound(String),

  #[error("session not found")]
  SessionNotFound,

  #[error("session expired at {expired_at}")]
  SessionExpired { expired_at: DateTime<Utc> },

  #[error("operation cancelled")]
  Cancelled,

  #[error("invalid incident: {0}")]
  InvalidIncident(String),

  #[error("unsupported database driver: {0:?}")]
  UnsupportedDriver(String),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[source] rusqlite::Error),

  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  /// A backend failure annotated with the operation and entity it hit.
  #[error("unable to {operation} {entity}: {source}")]
  Store {
    operation: &'static str,
    entity:    String,
    source:    Box<Error>,
  },
}

impl Error {
  /// Failures reported by the SQLite engine or the connection thread. The
  /// caller may retry these; bad stored data and API misuse are permanent.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Sqlite(e) => matches!(e, rusqlite::Error::SqliteFailure(..)),
      Self::Database(_) => true,
      Self::Store { source, .. } => source.is_transient(),
      _ => false,
    }
  }

  /// Wrap a backend or decode failure with `operation` and `entity`. Domain
  /// errors pass through unchanged so callers can still match on them.
  pub fn context(self, operation: &'static str, entity: impl Into<String>) -> Self {
    match self {
      Self::Sqlite(_) | Self::Database(_) | Self::Decode(_) | Self::Uuid(_) => Self::Store {
        operation,
        entity: entity.into(),
        source: Box::new(self),
      },
      other => other,
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    use rusqlite::Error as E;
    match e {
      // A row that does not fit its column type is bad stored data.
      E::FromSqlConversionFailure(..)
      | E::InvalidColumnType(..)
      | E::IntegralValueOutOfRange(..)
      | E::InvalidColumnIndex(_)
      | E::InvalidColumnName(_) => Self::Decode(e.to_string()),
      other => Self::Sqlite(other),
    }
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(e) => Self::from(e),
      other => Self::Database(other),
    }
  }
}

impl From<saferplace_core::Error> for Error {
  fn from(e: saferplace_core::Error) -> Self {
    use saferplace_core::Error as Core;
    match e {
      Core::Cancelled => Self::Cancelled,
      Core::SessionExpired(expired_at) => Self::SessionExpired { expired_at },
      Core::UnknownResolution(label) => {
        Self::Decode(format!("unknown resolution label: {label:?}"))
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  fn busy() -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
      rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
      None,
    )
  }

  #[test]
  fn context_wraps_backend_failures_only() {
    let wrapped = Error::from(busy()).context("view", "incident abc");
    assert!(wrapped.is_transient());
    assert!(matches!(
      wrapped,
      Error::Store { operation: "view", ref entity, .. } if entity == "incident abc"
    ));

    let domain = Error::IncidentNotFound("abc".into()).context("view", "incident abc");
    assert!(!domain.is_transient());
    assert!(matches!(domain, Error::IncidentNotFound(ref id) if id == "abc"));
  }

  #[test]
  fn engine_failures_are_transient_misuse_is_not() {
    assert!(Error::from(busy()).is_transient());
    assert!(Error::Database(tokio_rusqlite::Error::ConnectionClosed).is_transient());
    assert!(!Error::from(rusqlite::Error::InvalidQuery).is_transient());
    assert!(!Error::from(rusqlite::Error::QueryReturnedNoRows).is_transient());
  }

  #[test]
  fn row_conversion_failures_are_decode_errors() {
    let e = Error::from(rusqlite::Error::InvalidColumnType(
      1,
      "timestamp".into(),
      rusqlite::types::Type::Text,
    ));
    assert!(matches!(e, Error::Decode(_)));
    assert!(!e.is_transient());

    let wrapped = Error::from(tokio_rusqlite::Error::Rusqlite(
      rusqlite::Error::IntegralValueOutOfRange(1, i64::MAX),
    ))
    .context("view", "incident abc");
    assert!(matches!(*wrapped_source(&wrapped), Error::Decode(_)));
    assert!(!wrapped.is_transient());
  }

  fn wrapped_source(e: &Error) -> &Error {
    match e {
      Error::Store { source, .. } => source,
      other => panic!("expected Store, got {other:?}"),
    }
  }

  #[test]
  fn domain_errors_are_not_transient() {
    assert!(!Error::AlreadyExists("a".into()).is_transient());
    assert!(!Error::SessionNotFound.is_transient());
    assert!(!Error::Cancelled.is_transient());
  }

  #[test]
  fn core_errors_map_to_store_variants() {
    assert!(matches!(Error::from(saferplace_core::Error::Cancelled), Error::Cancelled));
    assert!(matches!(
      Error::from(saferplace_core::Error::UnknownResolution("X".into())),
      Error::Decode(_)
    ));
  }
}
