//! Error types for `saferplace-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown resolution label: {0:?}")]
  UnknownResolution(String),

  #[error("session expired at {0}")]
  SessionExpired(DateTime<Utc>),

  #[error("operation cancelled")]
  Cancelled,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
