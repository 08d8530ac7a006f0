//! [`SqliteStore`] — the SQLite implementation of [`SchemaStore`].

use std::{future::Future, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use schemata_core::{
  Error as CoreError,
  embed::{SELF_KEY, embed},
  revision::{DataRecord, NewDataRecord, NewSchema, SchemaRevision, SchemaUpdate},
  slug::slugify,
  store::SchemaStore,
  validate::SchemaValidator,
  version::{Version, next_version},
};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  encode::{
    RECORD_COLUMNS, REVISION_COLUMNS, RawDataRecord, RawRevision, decode_document,
    decode_version, encode_document, encode_dt,
  },
  schema::SCHEMA,
};

/// Bounded retry budget for racing proposers on the same title.
const PROPOSE_ATTEMPTS: usize = 3;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A schema registry backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:      tokio_rusqlite::Connection,
  validator: SchemaValidator,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, validator: SchemaValidator) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, validator };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory(validator: SchemaValidator) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, validator };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// One transactional propose attempt: read the latest version for the
  /// title, compute the next one, embed, insert. A unique-constraint hit
  /// (a racing proposer claimed the computed version first) comes back as
  /// `DuplicateVersion` for the caller to retry.
  async fn propose_once(&self, input: &NewSchema, slug: &str) -> Result<SchemaRevision> {
    let title = input.title.clone();
    let slug = slug.to_owned();
    let raw = input.raw_schema.clone();
    let bump = input.bump;
    let installation_id = input.installation_id.clone();
    let description = input.description.clone();
    let contributor = input.contributor.clone();

    let revision = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let latest: Option<(i64, i64)> = tx
          .query_row(
            "SELECT version_major, version_minor FROM schema_revisions
             WHERE title = ?1
             ORDER BY version_major DESC, version_minor DESC LIMIT 1",
            rusqlite::params![title],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let current = latest
          .map(|(major, minor)| decode_version(major, minor))
          .transpose()
          .map_err(other_err)?;
        let version = next_version(current, bump);
        let now = Utc::now();

        let mut revision = SchemaRevision {
          title,
          slug,
          version,
          installation_id,
          description,
          contributor,
          published: true,
          raw_schema: raw,
          served: Map::new(),
          created_at: now,
          modified_at: now,
        };
        revision.served = embed(&revision);

        let raw_json = encode_document(&revision.raw_schema).map_err(other_err)?;
        let served_json = encode_document(&revision.served).map_err(other_err)?;
        let at_str = encode_dt(now);

        let inserted = tx.execute(
          "INSERT INTO schema_revisions (
             title, slug, version_major, version_minor, installation_id,
             description, contributor, published, raw_json, served_json,
             created_at, modified_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?10, ?10)",
          rusqlite::params![
            revision.title,
            revision.slug,
            i64::from(version.major),
            i64::from(version.minor),
            revision.installation_id,
            revision.description,
            revision.contributor,
            raw_json,
            served_json,
            at_str,
          ],
        );
        match inserted {
          Err(rusqlite::Error::SqliteFailure(failure, _))
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            return Err(other_err(CoreError::DuplicateVersion {
              title: revision.title,
              version,
            }));
          }
          other => {
            other?;
          }
        }

        tx.commit()?;
        Ok(revision)
      })
      .await?;

    Ok(revision)
  }

  /// Resolve the internal row id and raw schema text of an exact revision.
  /// This is the (slug, version) snapshot data-record writes validate
  /// against; it is not re-checked mid-operation.
  async fn fetch_revision_ref(
    &self,
    slug: &str,
    version: Version,
  ) -> Result<Option<(i64, Map<String, Value>)>> {
    let slug = slug.to_owned();

    let row: Option<(i64, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT revision_id, raw_json FROM schema_revisions
               WHERE slug = ?1 AND version_major = ?2 AND version_minor = ?3",
              rusqlite::params![
                slug,
                i64::from(version.major),
                i64::from(version.minor)
              ],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(id, raw_json)| Ok((id, decode_document(&raw_json)?)))
      .transpose()
  }
}

/// Carry an arbitrary error out of a connection closure.
fn other_err(
  err: impl std::error::Error + Send + Sync + 'static,
) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err))
}

/// Did this closure error originate as a `DuplicateVersion` conflict?
fn is_duplicate_version(err: &tokio_rusqlite::Error) -> bool {
  matches!(err, tokio_rusqlite::Error::Other(boxed)
    if boxed
      .downcast_ref::<CoreError>()
      .is_some_and(|e| matches!(e, CoreError::DuplicateVersion { .. })))
}

/// Drive propose attempts until one wins, a non-conflict error surfaces, or
/// the retry budget is spent. A `DuplicateVersion` conflict means a racing
/// proposer claimed the computed version first; the next attempt re-reads
/// the latest version and recomputes.
async fn attempt_propose<F, Fut>(
  title: &str,
  mut attempt: F,
) -> Result<SchemaRevision>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<SchemaRevision>>,
{
  for _ in 0..PROPOSE_ATTEMPTS {
    match attempt().await {
      Ok(revision) => return Ok(revision),
      Err(Error::Database(err)) if is_duplicate_version(&err) => continue,
      Err(err) => return Err(err),
    }
  }

  Err(Error::Core(CoreError::ConflictRetry {
    title: title.to_owned(),
  }))
}

// ─── SchemaStore impl ────────────────────────────────────────────────────────

impl SchemaStore for SqliteStore {
  type Error = Error;

  // ── Schema revisions ──────────────────────────────────────────────────────

  async fn propose_schema(&self, input: NewSchema) -> Result<SchemaRevision> {
    self
      .validator
      .check_schema(&Value::Object(input.raw_schema.clone()))
      .map_err(Error::Core)?;

    // The reserved key never survives into the stored raw form.
    let mut input = input;
    input.raw_schema.remove(SELF_KEY);
    let slug = slugify(&input.title);

    attempt_propose(&input.title, || self.propose_once(&input, &slug)).await
  }

  async fn update_schema(
    &self,
    slug: &str,
    version: Version,
    changes: SchemaUpdate,
  ) -> Result<SchemaRevision> {
    if let Some(raw) = &changes.raw_schema {
      self
        .validator
        .check_schema(&Value::Object(raw.clone()))
        .map_err(Error::Core)?;
    }

    let slug_owned = slug.to_owned();

    let updated: Option<SchemaRevision> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let found: Option<(i64, RawRevision)> = tx
          .query_row(
            &format!(
              "SELECT revision_id, {REVISION_COLUMNS} FROM schema_revisions
               WHERE slug = ?1 AND version_major = ?2 AND version_minor = ?3"
            ),
            rusqlite::params![
              slug_owned,
              i64::from(version.major),
              i64::from(version.minor)
            ],
            |row| {
              let id: i64 = row.get(0)?;
              // Shift past the leading revision_id column.
              Ok((id, RawRevision {
                title:           row.get(1)?,
                slug:            row.get(2)?,
                version_major:   row.get(3)?,
                version_minor:   row.get(4)?,
                installation_id: row.get(5)?,
                description:     row.get(6)?,
                contributor:     row.get(7)?,
                published:       row.get(8)?,
                raw_json:        row.get(9)?,
                served_json:     row.get(10)?,
                created_at:      row.get(11)?,
                modified_at:     row.get(12)?,
              }))
            },
          )
          .optional()?;

        let Some((revision_id, raw_row)) = found else {
          return Ok(None);
        };

        let mut revision = raw_row.into_revision().map_err(other_err)?;
        if let Some(mut raw) = changes.raw_schema {
          raw.remove(SELF_KEY);
          revision.raw_schema = raw;
        }
        if let Some(description) = changes.description {
          revision.description = description;
        }
        if let Some(contributor) = changes.contributor {
          revision.contributor = contributor;
        }
        revision.modified_at = Utc::now();
        revision.served = embed(&revision);

        let raw_json = encode_document(&revision.raw_schema).map_err(other_err)?;
        let served_json = encode_document(&revision.served).map_err(other_err)?;

        tx.execute(
          "UPDATE schema_revisions
           SET description = ?1, contributor = ?2, raw_json = ?3,
               served_json = ?4, modified_at = ?5
           WHERE revision_id = ?6",
          rusqlite::params![
            revision.description,
            revision.contributor,
            raw_json,
            served_json,
            encode_dt(revision.modified_at),
            revision_id,
          ],
        )?;

        tx.commit()?;
        Ok(Some(revision))
      })
      .await?;

    updated.ok_or_else(|| {
      Error::Core(CoreError::NotFound {
        slug:    slug.to_owned(),
        version: Some(version),
      })
    })
  }

  async fn get_schema(
    &self,
    slug: &str,
    version: Option<Version>,
  ) -> Result<Option<SchemaRevision>> {
    let slug = slug.to_owned();

    let raw: Option<RawRevision> = self
      .conn
      .call(move |conn| {
        let raw = match version {
          // Exact revision, published or not.
          Some(version) => conn
            .query_row(
              &format!(
                "SELECT {REVISION_COLUMNS} FROM schema_revisions
                 WHERE slug = ?1 AND version_major = ?2 AND version_minor = ?3"
              ),
              rusqlite::params![
                slug,
                i64::from(version.major),
                i64::from(version.minor)
              ],
              RawRevision::from_row,
            )
            .optional()?,
          // Latest published revision for the slug.
          None => conn
            .query_row(
              &format!(
                "SELECT {REVISION_COLUMNS} FROM schema_revisions
                 WHERE slug = ?1 AND published = 1
                 ORDER BY version_major DESC, version_minor DESC LIMIT 1"
              ),
              rusqlite::params![slug],
              RawRevision::from_row,
            )
            .optional()?,
        };
        Ok(raw)
      })
      .await?;

    raw.map(RawRevision::into_revision).transpose()
  }

  async fn list_published(&self) -> Result<Vec<SchemaRevision>> {
    let raws: Vec<RawRevision> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVISION_COLUMNS} FROM schema_revisions
           WHERE published = 1
           ORDER BY title ASC, version_major DESC, version_minor DESC"
        ))?;
        let rows = stmt
          .query_map([], RawRevision::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRevision::into_revision).collect()
  }

  async fn set_published(
    &self,
    slug: &str,
    version: Version,
    published: bool,
  ) -> Result<SchemaRevision> {
    // Re-embed through the update path so `self.modified` in the served form
    // tracks the publish-state change like any other mutation.
    let slug_owned = slug.to_owned();

    let updated: Option<SchemaRevision> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let raw_row: Option<RawRevision> = tx
          .query_row(
            &format!(
              "SELECT {REVISION_COLUMNS} FROM schema_revisions
               WHERE slug = ?1 AND version_major = ?2 AND version_minor = ?3"
            ),
            rusqlite::params![
              slug_owned,
              i64::from(version.major),
              i64::from(version.minor)
            ],
            RawRevision::from_row,
          )
          .optional()?;

        let Some(raw_row) = raw_row else {
          return Ok(None);
        };

        let mut revision = raw_row.into_revision().map_err(other_err)?;
        revision.published = published;
        revision.modified_at = Utc::now();
        revision.served = embed(&revision);

        let served_json = encode_document(&revision.served).map_err(other_err)?;
        tx.execute(
          "UPDATE schema_revisions
           SET published = ?1, served_json = ?2, modified_at = ?3
           WHERE slug = ?4 AND version_major = ?5 AND version_minor = ?6",
          rusqlite::params![
            published,
            served_json,
            encode_dt(revision.modified_at),
            revision.slug,
            i64::from(version.major),
            i64::from(version.minor),
          ],
        )?;

        tx.commit()?;
        Ok(Some(revision))
      })
      .await?;

    updated.ok_or_else(|| {
      Error::Core(CoreError::NotFound {
        slug:    slug.to_owned(),
        version: Some(version),
      })
    })
  }

  // ── Data records ──────────────────────────────────────────────────────────

  async fn write_data_record(&self, input: NewDataRecord) -> Result<DataRecord> {
    let Some((revision_id, raw_schema)) = self
      .fetch_revision_ref(&input.schema_slug, input.schema_version)
      .await?
    else {
      return Err(Error::Core(CoreError::NotFound {
        slug:    input.schema_slug,
        version: Some(input.schema_version),
      }));
    };

    self
      .validator
      .validate_data(&Value::Object(raw_schema), &input.payload)
      .map_err(Error::Core)?;

    let payload_json = serde_json::to_string(&input.payload)?;
    let at_str = encode_dt(Utc::now());
    let subject_id = input.subject_id;
    let data_version = input.data_version;

    let raw: RawDataRecord = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Re-writes to an existing key update the payload in place and keep
        // created_at.
        tx.execute(
          "INSERT INTO data_records (
             revision_id, subject_id, data_version, payload_json, published,
             created_at, modified_at
           ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
           ON CONFLICT (revision_id, subject_id, data_version)
           DO UPDATE SET payload_json = excluded.payload_json,
                         modified_at  = excluded.modified_at",
          rusqlite::params![revision_id, subject_id, data_version, payload_json, at_str],
        )?;

        let raw = tx.query_row(
          &format!(
            "SELECT {RECORD_COLUMNS} FROM data_records d
             JOIN schema_revisions s ON s.revision_id = d.revision_id
             WHERE d.revision_id = ?1 AND d.subject_id = ?2 AND d.data_version = ?3"
          ),
          rusqlite::params![revision_id, subject_id, data_version],
          RawDataRecord::from_row,
        )?;

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_record()
  }

  async fn get_data_record(
    &self,
    slug: &str,
    version: Version,
    subject_id: i64,
    data_version: i64,
  ) -> Result<Option<DataRecord>> {
    let slug = slug.to_owned();

    let raw: Option<RawDataRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM data_records d
                 JOIN schema_revisions s ON s.revision_id = d.revision_id
                 WHERE s.slug = ?1 AND s.version_major = ?2 AND s.version_minor = ?3
                   AND d.subject_id = ?4 AND d.data_version = ?5"
              ),
              rusqlite::params![
                slug,
                i64::from(version.major),
                i64::from(version.minor),
                subject_id,
                data_version
              ],
              RawDataRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDataRecord::into_record).transpose()
  }

  async fn list_data_records(
    &self,
    slug: &str,
    version: Version,
  ) -> Result<Vec<DataRecord>> {
    let slug = slug.to_owned();

    let raws: Vec<RawDataRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM data_records d
           JOIN schema_revisions s ON s.revision_id = d.revision_id
           WHERE s.slug = ?1 AND s.version_major = ?2 AND s.version_minor = ?3
           ORDER BY d.subject_id ASC, d.data_version DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              slug,
              i64::from(version.major),
              i64::from(version.minor)
            ],
            RawDataRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDataRecord::into_record).collect()
  }

  async fn check_payload(
    &self,
    slug: &str,
    version: Version,
    payload: &Value,
  ) -> Result<()> {
    let Some((_, raw_schema)) = self.fetch_revision_ref(slug, version).await? else {
      return Err(Error::Core(CoreError::NotFound {
        slug:    slug.to_owned(),
        version: Some(version),
      }));
    };

    self
      .validator
      .validate_data(&Value::Object(raw_schema), payload)
      .map_err(Error::Core)
  }
}

// ─── Conflict-path tests ─────────────────────────────────────────────────────
//
// The race these exercise cannot be scheduled deterministically through the
// public API (a single connection serialises read-latest + insert), so the
// retry machinery is driven directly and the constraint itself is hit with a
// raw duplicate insert.
