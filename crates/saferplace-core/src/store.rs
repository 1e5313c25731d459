//! The `IncidentStore` and `SessionStore` traits.
//!
//! Implemented by storage backends (e.g. `saferplace-store-sqlite`). The
//! service layer depends on these abstractions, not on a concrete backend.
//!
//! Every method takes a [`Cancel`] signal and runs as one self-contained unit:
//! it either commits all of its writes or none of them.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  Cancel, Resolution,
  incident::{Comment, Coordinates, Incident, NewComment, Region},
};

// ─── Incidents ───────────────────────────────────────────────────────────────

/// Abstraction over the incident persistence backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait IncidentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new incident. Fails if an incident with the same id exists;
  /// nothing is written in that case. Comments on the input are ignored.
  fn create(
    &self,
    cancel: Cancel,
    incident: Incident,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Set the incident's resolution and append `comment` stamped with it, in
  /// one transaction. Returns the stored comment.
  fn review(
    &self,
    cancel: Cancel,
    id: String,
    resolution: Resolution,
    comment: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// Fetch an incident with its comments, oldest first.
  fn view(
    &self,
    cancel: Cancel,
    id: String,
  ) -> impl Future<Output = Result<Incident, Self::Error>> + Send + '_;

  /// All incidents still at [`Resolution::Unspecified`].
  fn list_without_review(
    &self,
    cancel: Cancel,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  /// Accepted or alerted incidents within `radius` kilometres of `center`.
  fn list_in_radius(
    &self,
    cancel: Cancel,
    center: Coordinates,
    radius: f64,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  /// Accepted or alerted incidents newer than `since` inside `region`.
  fn list_in_region(
    &self,
    cancel: Cancel,
    since: DateTime<Utc>,
    region: Region,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;

  /// Like [`IncidentStore::list_in_region`], restricted to alerted incidents.
  fn alerting_incidents(
    &self,
    cancel: Cancel,
    since: DateTime<Utc>,
    region: Region,
  ) -> impl Future<Output = Result<Vec<Incident>, Self::Error>> + Send + '_;
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// Abstraction over session persistence.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `token` with an expiry of now plus
  /// [`SESSION_TTL`](crate::session::SESSION_TTL).
  fn save_session(
    &self,
    cancel: Cancel,
    token: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Succeeds iff `token` was saved and has not expired. Never mutates.
  fn is_valid_session(
    &self,
    cancel: Cancel,
    token: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
