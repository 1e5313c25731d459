//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as integer seconds since the epoch. Resolutions are
//! stored as their canonical labels. Comment ids are hyphenated lowercase
//! UUIDs.

use chrono::{DateTime, SubsecRound as _, Utc};
use saferplace_core::{
  Resolution,
  incident::{Comment, Coordinates, Incident},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_ts(dt: DateTime<Utc>) -> i64 { dt.timestamp() }

/// `dt` truncated to the whole second [`encode_ts`] keeps.
pub fn whole_seconds(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(0) }

pub fn decode_ts(secs: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(secs, 0)
    .ok_or_else(|| Error::Decode(format!("timestamp out of range: {secs}")))
}

// ─── Resolution ──────────────────────────────────────────────────────────────

pub fn encode_resolution(r: Resolution) -> &'static str { r.as_str() }

pub fn decode_resolution(s: &str) -> Result<Resolution> { Ok(s.parse()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawIncident::from_row`].
pub const INCIDENT_COLUMNS: &str =
  "id, timestamp, description, lat, lon, resolution, image";

/// Values read directly from an `incidents` row.
pub struct RawIncident {
  pub id:          String,
  pub timestamp:   i64,
  pub description: Option<String>,
  pub lat:         f64,
  pub lon:         f64,
  pub resolution:  String,
  pub image:       String,
}

impl RawIncident {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      timestamp:   row.get(1)?,
      description: row.get(2)?,
      lat:         row.get(3)?,
      lon:         row.get(4)?,
      resolution:  row.get(5)?,
      image:       row.get(6)?,
    })
  }

  pub fn into_incident(self) -> Result<Incident> {
    Ok(Incident {
      id:          self.id,
      timestamp:   decode_ts(self.timestamp)?,
      description: self.description.unwrap_or_default(),
      coordinates: Coordinates::new(self.lat, self.lon),
      resolution:  decode_resolution(&self.resolution)?,
      image_id:    self.image,
      comments:    Vec::new(),
    })
  }
}

/// Column list matching [`RawComment::from_row`].
pub const COMMENT_COLUMNS: &str =
  "id, incident_id, timestamp, author, comment, resolution";

/// Values read directly from a `comments` row.
pub struct RawComment {
  pub id:          String,
  pub incident_id: String,
  pub timestamp:   i64,
  pub author:      String,
  pub comment:     String,
  pub resolution:  String,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      incident_id: row.get(1)?,
      timestamp:   row.get(2)?,
      author:      row.get(3)?,
      comment:     row.get(4)?,
      resolution:  row.get(5)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id:  decode_uuid(&self.id)?,
      incident_id: self.incident_id,
      timestamp:   decode_ts(self.timestamp)?,
      author_id:   self.author,
      message:     self.comment,
      resolution:  decode_resolution(&self.resolution)?,
    })
  }
}

/// Decode a batch of incident rows, failing on the first bad row.
pub fn decode_incidents(raws: Vec<RawIncident>) -> Result<Vec<Incident>> {
  raws.into_iter().map(RawIncident::into_incident).collect()
}
