//! Short-lived authentication sessions keyed by their bearer token.

use chrono::{DateTime, Duration, Utc};

use crate::{Error, Result};

/// How long a session stays valid after it is saved.
pub const SESSION_TTL: Duration = Duration::hours(1);

/// A stored session. The token itself is the identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
  pub token:  String,
  pub expiry: DateTime<Utc>,
}

impl Session {
  /// A session for `token` expiring [`SESSION_TTL`] after `now`.
  pub fn issue(token: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self { token: token.into(), expiry: now + SESSION_TTL }
  }

  /// Valid iff `now <= expiry`.
  pub fn check(&self, now: DateTime<Utc>) -> Result<()> {
    if now > self.expiry {
      return Err(Error::SessionExpired(self.expiry));
    }
    Ok(())
  }
}

// Tokens are credentials; keep them out of logs.
impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("token", &"<redacted>")
      .field("expiry", &self.expiry)
      .finish()
  }
}
