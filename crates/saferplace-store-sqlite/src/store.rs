//! [`SqliteStore`] — the SQLite implementation of [`IncidentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use saferplace_core::{
  Cancel, Resolution,
  incident::{Comment, Coordinates, Incident, NewComment, Region, sort_comments},
  store::IncidentStore,
};
use uuid::Uuid;

use crate::{
  Error, Result, StoreConfig,
  encode::{
    COMMENT_COLUMNS, INCIDENT_COLUMNS, RawComment, RawIncident, decode_incidents,
    encode_resolution, encode_ts, encode_uuid, whole_seconds,
  },
  schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An incident store backed by a single SQLite database.
///
/// Cloning is cheap — the inner connection is reference-counted. All clones
/// share one connection thread, so operations never interleave.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open the store described by `config` and run schema initialisation.
  pub async fn connect(config: &StoreConfig) -> Result<Self> {
    config.validate()?;
    Self::open(&config.dsn).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path)
      .await
      .map_err(|e| Error::from(e).context("open database", path.display().to_string()))?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::info!(path = %path.display(), "opened incident store");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        schema::init(conn)?;
        Ok(())
      })
      .await
      .map_err(|e| Error::from(e).context("initialise", "schema"))?;
    Ok(())
  }

  /// Check `cancel`, then run `f` on the connection thread.
  ///
  /// `f` owns any transaction it opens; dropping it on an error path rolls
  /// the transaction back.
  pub(crate) async fn run<T, F>(&self, cancel: &Cancel, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    cancel.check()?;
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────

fn incident_exists(conn: &rusqlite::Connection, id: &str) -> Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM incidents WHERE id = ?1", [id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn is_primary_key_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

fn query_incidents(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<RawIncident>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params, RawIncident::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn insert_incident(
  conn: &mut rusqlite::Connection,
  cancel: &Cancel,
  incident: &Incident,
) -> Result<()> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  // The primary key is authoritative; this check only avoids a doomed insert.
  if incident_exists(&tx, &incident.id)? {
    return Err(Error::AlreadyExists(incident.id.clone()));
  }
  cancel.check()?;

  insert_incident_row(&tx, incident)?;

  cancel.check()?;
  tx.commit()?;
  Ok(())
}

/// Insert one `incidents` row, reporting a primary-key clash as
/// [`Error::AlreadyExists`].
fn insert_incident_row(conn: &rusqlite::Connection, incident: &Incident) -> Result<()> {
  let inserted = conn.execute(
    "INSERT INTO incidents (id, timestamp, description, lat, lon, resolution, image)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      incident.id,
      encode_ts(incident.timestamp),
      incident.description,
      incident.coordinates.lat,
      incident.coordinates.lon,
      encode_resolution(incident.resolution),
      incident.image_id,
    ],
  );
  match inserted {
    Err(e) if is_primary_key_violation(&e) => {
      Err(Error::AlreadyExists(incident.id.clone()))
    }
    other => {
      other?;
      Ok(())
    }
  }
}

fn apply_review(
  conn: &mut rusqlite::Connection,
  cancel: &Cancel,
  comment: &Comment,
) -> Result<()> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  if !incident_exists(&tx, &comment.incident_id)? {
    return Err(Error::IncidentNotFound(comment.incident_id.clone()));
  }
  cancel.check()?;

  let resolution = encode_resolution(comment.resolution);
  tx.execute(
    "UPDATE incidents SET resolution = ?1 WHERE id = ?2",
    rusqlite::params![resolution, comment.incident_id],
  )?;
  cancel.check()?;

  tx.execute(
    "INSERT INTO comments (id, incident_id, timestamp, author, comment, resolution)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(comment.comment_id),
      comment.incident_id,
      encode_ts(comment.timestamp),
      comment.author_id,
      comment.message,
      resolution,
    ],
  )?;

  cancel.check()?;
  tx.commit()?;
  Ok(())
}

fn read_incident(
  conn: &mut rusqlite::Connection,
  cancel: &Cancel,
  id: &str,
) -> Result<(RawIncident, Vec<RawComment>)> {
  // Deferred: a read snapshot across both tables.
  let tx = conn.transaction()?;

  let incident = tx
    .query_row(
      &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"),
      [id],
      RawIncident::from_row,
    )
    .optional()?
    .ok_or_else(|| Error::IncidentNotFound(id.to_owned()))?;
  cancel.check()?;

  let mut stmt = tx.prepare(&format!(
    "SELECT {COMMENT_COLUMNS} FROM comments WHERE incident_id = ?1"
  ))?;
  let comments = stmt
    .query_map([id], RawComment::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  drop(stmt);

  cancel.check()?;
  tx.commit()?;
  Ok((incident, comments))
}

fn assemble_incident(raw: RawIncident, raw_comments: Vec<RawComment>) -> Result<Incident> {
  let mut incident = raw.into_incident()?;
  incident.comments = raw_comments
    .into_iter()
    .map(RawComment::into_comment)
    .collect::<Result<_>>()?;
  sort_comments(&mut incident.comments);
  Ok(incident)
}

// ─── IncidentStore impl ──────────────────────────────────────────────────────

impl IncidentStore for SqliteStore {
  type Error = Error;

  async fn create(&self, cancel: Cancel, mut incident: Incident) -> Result<()> {
    if incident.id.is_empty() {
      return Err(Error::InvalidIncident("id must not be empty".into()));
    }
    incident.comments.clear();
    incident.timestamp = whole_seconds(incident.timestamp);

    let id = incident.id.clone();
    let task_cancel = cancel.clone();
    let incident = self
      .run(&cancel, move |conn| {
        insert_incident(conn, &task_cancel, &incident)?;
        Ok(incident)
      })
      .await
      .map_err(|e| e.context("create incident", &id))?;

    tracing::info!(id = %incident.id, resolution = %incident.resolution, "incident created");
    Ok(())
  }

  async fn review(
    &self,
    cancel: Cancel,
    id: String,
    resolution: Resolution,
    comment: NewComment,
  ) -> Result<Comment> {
    let comment = Comment {
      comment_id: Uuid::new_v4(),
      incident_id: id,
      timestamp: whole_seconds(comment.timestamp),
      author_id: comment.author_id,
      message: comment.message,
      resolution,
    };

    let entity = format!("incident {}", comment.incident_id);
    let task_cancel = cancel.clone();
    let comment = self
      .run(&cancel, move |conn| {
        apply_review(conn, &task_cancel, &comment)?;
        Ok(comment)
      })
      .await
      .map_err(|e| e.context("review", entity))?;

    tracing::info!(
      id = %comment.incident_id,
      %resolution,
      author = %comment.author_id,
      "incident reviewed"
    );
    Ok(comment)
  }

  async fn view(&self, cancel: Cancel, id: String) -> Result<Incident> {
    let entity = format!("incident {id}");
    let task_cancel = cancel.clone();
    let (raw, raw_comments) = self
      .run(&cancel, move |conn| read_incident(conn, &task_cancel, &id))
      .await
      .map_err(|e| e.context("view", &entity))?;

    let incident = assemble_incident(raw, raw_comments)
      .map_err(|e| e.context("view", &entity))?;

    tracing::debug!(id = %incident.id, comments = incident.comments.len(), "viewed incident");
    Ok(incident)
  }

  async fn list_without_review(&self, cancel: Cancel) -> Result<Vec<Incident>> {
    let raws = self
      .run(&cancel, |conn| {
        query_incidents(
          conn,
          &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE resolution = ?1"),
          [encode_resolution(Resolution::Unspecified)],
        )
      })
      .await
      .map_err(|e| e.context("list", "unreviewed incidents"))?;

    tracing::debug!(count = raws.len(), "listed unreviewed incidents");
    decode_incidents(raws).map_err(|e| e.context("list", "unreviewed incidents"))
  }

  async fn list_in_radius(
    &self,
    cancel: Cancel,
    center: Coordinates,
    radius: f64,
  ) -> Result<Vec<Incident>> {
    // SQLite has no geospatial operators: narrow by resolution here, measure
    // distance in Rust.
    let raws = self
      .run(&cancel, |conn| {
        query_incidents(
          conn,
          &format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents
             WHERE resolution = ?1 OR resolution = ?2"
          ),
          [
            encode_resolution(Resolution::Accepted),
            encode_resolution(Resolution::Alerted),
          ],
        )
      })
      .await
      .map_err(|e| e.context("list", "incidents in radius"))?;

    let candidates = raws.len();
    let mut incidents = decode_incidents(raws)
      .map_err(|e| e.context("list", "incidents in radius"))?;
    incidents.retain(|i| i.coordinates.distance_to(&center) <= radius);

    tracing::debug!(
      lat = center.lat,
      lon = center.lon,
      radius,
      candidates,
      matched = incidents.len(),
      "listed incidents in radius"
    );
    Ok(incidents)
  }

  async fn list_in_region(
    &self,
    cancel: Cancel,
    since: DateTime<Utc>,
    region: Region,
  ) -> Result<Vec<Incident>> {
    let incidents = self
      .region_query(
        cancel,
        "resolution = ?1 OR resolution = ?2",
        [Resolution::Accepted, Resolution::Alerted],
        since,
        region,
      )
      .await
      .map_err(|e| e.context("list", "incidents in region"))?;

    tracing::debug!(?region, count = incidents.len(), "listed incidents in region");
    Ok(incidents)
  }

  async fn alerting_incidents(
    &self,
    cancel: Cancel,
    since: DateTime<Utc>,
    region: Region,
  ) -> Result<Vec<Incident>> {
    let incidents = self
      .region_query(cancel, "resolution = ?1", [Resolution::Alerted], since, region)
      .await
      .map_err(|e| e.context("list", "alerting incidents"))?;

    tracing::debug!(?region, count = incidents.len(), "listed alerting incidents");
    Ok(incidents)
  }
}

impl SqliteStore {
  /// Incidents matching `resolution_filter` (placeholders `?1..?N` bound to
  /// `resolutions`) newer than `since` inside the descaled `region`.
  ///
  /// Bounds: `timestamp > since`, `south <= lat < north`,
  /// `west <= lon <= east`.
  async fn region_query<const N: usize>(
    &self,
    cancel: Cancel,
    resolution_filter: &'static str,
    resolutions: [Resolution; N],
    since: DateTime<Utc>,
    region: Region,
  ) -> Result<Vec<Incident>> {
    let bounds = region.bounds();
    let sql = format!(
      "SELECT {INCIDENT_COLUMNS} FROM incidents
       WHERE ({resolution_filter})
         AND timestamp > ?{}
         AND lat < ?{}
         AND lat >= ?{}
         AND lon >= ?{}
         AND lon <= ?{}",
      N + 1,
      N + 2,
      N + 3,
      N + 4,
      N + 5,
    );

    let mut params: Vec<rusqlite::types::Value> = resolutions
      .iter()
      .map(|r| rusqlite::types::Value::Text(encode_resolution(*r).to_owned()))
      .collect();
    params.push(encode_ts(since).into());
    params.extend(
      [bounds.north, bounds.south, bounds.west, bounds.east]
        .map(rusqlite::types::Value::Real),
    );

    let raws = self
      .run(&cancel, move |conn| {
        query_incidents(conn, &sql, rusqlite::params_from_iter(params))
      })
      .await?;

    decode_incidents(raws)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn conn() -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    schema::init(&conn).unwrap();
    conn
  }

  fn incident(id: &str) -> Incident {
    Incident::new(
      id,
      Utc.timestamp_opt(100, 0).unwrap(),
      "desc",
      Coordinates::new(1.0, 1.0),
      "img",
    )
  }

  fn cancelled() -> Cancel {
    let c = Cancel::never();
    c.cancel();
    c
  }

  #[test]
  fn cancel_inside_create_rolls_back() {
    let mut conn = conn();
    let err = insert_incident(&mut conn, &cancelled(), &incident("x")).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(!incident_exists(&conn, "x").unwrap());
  }

  #[test]
  fn cancel_inside_review_rolls_back_both_writes() {
    let mut conn = conn();
    insert_incident(&mut conn, &Cancel::never(), &incident("x")).unwrap();

    let comment = Comment {
      comment_id:  Uuid::new_v4(),
      incident_id: "x".into(),
      timestamp:   Utc.timestamp_opt(200, 0).unwrap(),
      author_id:   "a".into(),
      message:     "m".into(),
      resolution:  Resolution::Alerted,
    };
    let err = apply_review(&mut conn, &cancelled(), &comment).unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let (raw, comments) = read_incident(&mut conn, &Cancel::never(), "x").unwrap();
    assert_eq!(raw.resolution, "RESOLUTION_UNSPECIFIED");
    assert!(comments.is_empty());
  }

  #[test]
  fn primary_key_clash_on_insert_is_already_exists() {
    let mut conn = conn();
    let tx = conn.transaction().unwrap();
    insert_incident_row(&tx, &incident("x")).unwrap();

    let err = insert_incident_row(&tx, &incident("x")).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(ref id) if id == "x"));
    assert!(!err.is_transient());
  }

  #[test]
  fn primary_key_violation_is_detected() {
    let mut conn = conn();
    insert_incident(&mut conn, &Cancel::never(), &incident("x")).unwrap();
    let err = conn
      .execute(
        "INSERT INTO incidents (id, timestamp, lat, lon, resolution, image)
         VALUES ('x', 0, 0, 0, 'RESOLUTION_UNSPECIFIED', '')",
        [],
      )
      .unwrap_err();
    assert!(is_primary_key_violation(&err));
  }

  #[test]
  fn schema_init_is_idempotent() {
    let conn = conn();
    schema::init(&conn).unwrap();
    schema::init(&conn).unwrap();
    let indexes: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'index' AND name IN ('lat', 'lon', 'incident_ids')",
        [],
        |r| r.get(0),
      )
      .unwrap();
    assert_eq!(indexes, 3);
  }
}
