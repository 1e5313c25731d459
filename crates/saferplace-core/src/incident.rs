//! Incidents, their reviewer comments, and the query region.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Resolution, geo};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lon: f64,
}

impl Coordinates {
  pub fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }

  /// Great-circle distance to `other`, in kilometres.
  pub fn distance_to(&self, other: &Coordinates) -> f64 {
    geo::distance(self.lat, self.lon, other.lat, other.lon)
  }
}

/// A reported safety event.
///
/// `id` is assigned by the caller. `resolution` is the only field that changes
/// after creation, and only through a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
  pub id:          String,
  pub timestamp:   DateTime<Utc>,
  pub description: String,
  pub coordinates: Coordinates,
  #[serde(default)]
  pub resolution:  Resolution,
  pub image_id:    String,
  /// Oldest first. Empty for list queries; populated by `view`.
  #[serde(default)]
  pub comments:    Vec<Comment>,
}

impl Incident {
  /// A fresh, unreviewed incident with no comments.
  pub fn new(
    id: impl Into<String>,
    timestamp: DateTime<Utc>,
    description: impl Into<String>,
    coordinates: Coordinates,
    image_id: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      timestamp,
      description: description.into(),
      coordinates,
      resolution: Resolution::Unspecified,
      image_id: image_id.into(),
      comments: Vec::new(),
    }
  }
}

/// Input to a review: the caller-authored part of a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
  pub timestamp: DateTime<Utc>,
  pub author_id: String,
  pub message:   String,
}

impl NewComment {
  pub fn new(
    timestamp: DateTime<Utc>,
    author_id: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self {
      timestamp,
      author_id: author_id.into(),
      message: message.into(),
    }
  }
}

/// A persisted reviewer comment.
///
/// `resolution` is the value applied by the review that wrote this comment,
/// not the incident's current resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id:  Uuid,
  pub incident_id: String,
  pub timestamp:   DateTime<Utc>,
  pub author_id:   String,
  pub message:     String,
  pub resolution:  Resolution,
}

/// Sort comments oldest to newest. Stable, so equal timestamps keep their
/// fetch order.
pub fn sort_comments(comments: &mut [Comment]) {
  comments.sort_by_key(|c| c.timestamp);
}

// ─── Region ──────────────────────────────────────────────────────────────────

/// Divisor applied to every [`Region`] bound before comparing with stored
/// coordinates.
pub const REGION_SCALE: f64 = 100.0;

/// An axis-aligned bounding box in scaled integer degrees: `north = 1000`
/// means latitude 10.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
  pub north: i64,
  pub south: i64,
  pub west:  i64,
  pub east:  i64,
}

/// A [`Region`] descaled to plain degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
  pub north: f64,
  pub south: f64,
  pub west:  f64,
  pub east:  f64,
}

impl Region {
  pub fn bounds(&self) -> Bounds {
    Bounds {
      north: self.north as f64 / REGION_SCALE,
      south: self.south as f64 / REGION_SCALE,
      west:  self.west as f64 / REGION_SCALE,
      east:  self.east as f64 / REGION_SCALE,
    }
  }
}
