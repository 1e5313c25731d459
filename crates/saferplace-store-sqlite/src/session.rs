//! [`SessionStore`] for [`SqliteStore`].
//!
//! Expired rows are left in place; validity is decided on read.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use saferplace_core::{Cancel, session::Session, store::SessionStore};

use crate::{
  Error, Result, SqliteStore,
  encode::{decode_ts, encode_ts},
};

impl SessionStore for SqliteStore {
  type Error = Error;

  async fn save_session(&self, cancel: Cancel, token: String) -> Result<()> {
    let session = Session::issue(token, Utc::now());
    let expiry = session.expiry;

    // Saving a known token again moves its expiry forward.
    self
      .run(&cancel, move |conn| {
        conn.execute(
          "INSERT INTO sessions (id, expiry) VALUES (?1, ?2)
           ON CONFLICT (id) DO UPDATE SET expiry = excluded.expiry",
          rusqlite::params![session.token, encode_ts(session.expiry)],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| e.context("save", "session"))?;

    tracing::debug!(%expiry, "session saved");
    Ok(())
  }

  async fn is_valid_session(&self, cancel: Cancel, token: String) -> Result<()> {
    let key = token.clone();
    let stored: Option<i64> = self
      .run(&cancel, move |conn| {
        Ok(
          conn
            .query_row("SELECT expiry FROM sessions WHERE id = ?1", [&key], |r| {
              r.get(0)
            })
            .optional()?,
        )
      })
      .await
      .map_err(|e| e.context("validate", "session"))?;

    let Some(expiry) = stored else {
      tracing::warn!("rejected unknown session");
      return Err(Error::SessionNotFound);
    };

    let expiry = decode_ts(expiry).map_err(|e| e.context("validate", "session"))?;
    let session = Session { token, expiry };
    session.check(Utc::now()).map_err(|e| {
      tracing::warn!(expiry = %session.expiry, "rejected expired session");
      Error::from(e)
    })
  }
}
