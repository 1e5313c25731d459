//! Caller-supplied cancellation for store operations.
//!
//! A [`Cancel`] is checked before an operation is dispatched and between the
//! statements of its transaction. Once it fires the transaction is rolled back
//! and the operation fails with [`Error::Cancelled`].

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::{Duration, Instant},
};

use crate::{Error, Result};

/// A cloneable cancellation signal with an optional deadline.
///
/// Clones share the same flag: cancelling one cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct Cancel {
  flag:     Arc<AtomicBool>,
  deadline: Option<Instant>,
}

impl Cancel {
  /// A signal that fires only when [`Cancel::cancel`] is called.
  pub fn never() -> Self { Self::default() }

  pub fn with_deadline(deadline: Instant) -> Self {
    Self { flag: Arc::default(), deadline: Some(deadline) }
  }

  pub fn with_timeout(timeout: Duration) -> Self {
    Self::with_deadline(Instant::now() + timeout)
  }

  pub fn cancel(&self) { self.flag.store(true, Ordering::SeqCst); }

  pub fn is_cancelled(&self) -> bool {
    self.flag.load(Ordering::SeqCst)
      || self.deadline.is_some_and(|d| Instant::now() >= d)
  }

  pub fn check(&self) -> Result<()> {
    if self.is_cancelled() {
      return Err(Error::Cancelled);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn never_is_live_until_cancelled() {
    let c = Cancel::never();
    assert!(c.check().is_ok());
    c.cancel();
    assert!(matches!(c.check(), Err(Error::Cancelled)));
  }

  #[test]
  fn clones_share_the_flag() {
    let c = Cancel::never();
    let other = c.clone();
    other.cancel();
    assert!(c.is_cancelled());
  }

  #[test]
  fn past_deadline_is_cancelled() {
    let c = Cancel::with_timeout(Duration::ZERO);
    assert!(c.is_cancelled());
  }

  #[test]
  fn future_deadline_is_live() {
    let c = Cancel::with_timeout(Duration::from_secs(3_600));
    assert!(!c.is_cancelled());
  }
}
