//! SQL schema for the Schemata SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per schema revision. Revisions are never deleted or renumbered;
-- the UNIQUE constraint on (title, version) is the final arbiter when
-- concurrent proposers race on the same title.
CREATE TABLE IF NOT EXISTS schema_revisions (
    revision_id     INTEGER PRIMARY KEY,
    title           TEXT NOT NULL,
    slug            TEXT NOT NULL,      -- derived from title; not unique alone
    version_major   INTEGER NOT NULL,
    version_minor   INTEGER NOT NULL,
    installation_id TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    contributor     TEXT NOT NULL DEFAULT '',
    published       INTEGER NOT NULL DEFAULT 1,
    raw_json        TEXT NOT NULL,      -- schema as proposed, reserved key stripped
    served_json     TEXT NOT NULL,      -- embedded form, persisted at write time
    created_at      TEXT NOT NULL,      -- ISO 8601 UTC; server-assigned
    modified_at     TEXT NOT NULL,
    UNIQUE (title, version_major, version_minor)
);

CREATE TABLE IF NOT EXISTS data_records (
    record_id    INTEGER PRIMARY KEY,
    revision_id  INTEGER NOT NULL REFERENCES schema_revisions(revision_id),
    subject_id   INTEGER NOT NULL,
    data_version INTEGER NOT NULL,
    payload_json TEXT NOT NULL,
    published    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    modified_at  TEXT NOT NULL,
    UNIQUE (revision_id, subject_id, data_version)
);

CREATE INDEX IF NOT EXISTS revisions_slug_idx    ON schema_revisions(slug);
CREATE INDEX IF NOT EXISTS revisions_title_idx   ON schema_revisions(title);
CREATE INDEX IF NOT EXISTS records_revision_idx  ON data_records(revision_id);

PRAGMA user_version = 1;
";
