//! Inventory record store.
//!
//! # Table layout
//!
//! ```text
//! inventory_records
//!   id             INTEGER PRIMARY KEY
//!   collection_id  TEXT NOT NULL
//!   project_id     TEXT NOT NULL
//!   build_number   TEXT NOT NULL
//!   archived       INTEGER NOT NULL DEFAULT 0
//!   updated_at     TEXT NOT NULL DEFAULT <now, RFC 3339>
//!
//!   UNIQUE (collection_id, project_id, build_number)
//!   UNIQUE (collection_id, project_id) WHERE archived = 0
//! ```
//!
//! Every operation opens its own connection and drops it before returning.
//! Nothing holds the database across a reconcile cycle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags};

use crate::error::StoreError;
use crate::types::{InventoryRecord, NewRecord, RecordKey};

pub const TABLE: &str = "inventory_records";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS inventory_records (
    id             INTEGER PRIMARY KEY,
    collection_id  TEXT NOT NULL,
    project_id     TEXT NOT NULL,
    build_number   TEXT NOT NULL,
    archived       INTEGER NOT NULL DEFAULT 0,
    updated_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_inventory_identity
    ON inventory_records(collection_id, project_id, build_number);
CREATE UNIQUE INDEX IF NOT EXISTS idx_inventory_live_project
    ON inventory_records(collection_id, project_id) WHERE archived = 0;
";

/// Read/write seam over the persisted inventory.
pub trait RecordStore: Send + Sync {
    /// All records with `archived = false`, in no particular order.
    fn fetch_pending(&self) -> Result<Vec<InventoryRecord>, StoreError>;

    /// Flip the record identified by `key` to archived.
    ///
    /// Returns the number of rows changed: `1` the first time, `0` on any
    /// repeat call or when no such pending record exists.
    fn mark_archived(&self, key: &RecordKey) -> Result<usize, StoreError>;
}

/// SQLite-backed [`RecordStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Accepts `sqlite://<path>`, `sqlite:<path>` or a bare path.
    ///
    /// In-memory databases are rejected: each operation opens a fresh
    /// connection, so an in-memory database would be empty every time.
    pub fn from_connection_string(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim();
        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);
        if path.is_empty() || path == ":memory:" {
            return Err(StoreError::InvalidConnectionString(raw.to_string()));
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table and indexes if absent. Creates the database file too.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert a pending record. Used by ingestion tooling and tests.
    pub fn insert_record(&self, record: &NewRecord) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO inventory_records (collection_id, project_id, build_number)
             VALUES (?1, ?2, ?3)",
            params![
                record.key.collection_id.0,
                record.key.project_id.0,
                record.key.build_number.0
            ],
        )?;
        Ok(())
    }

    /// Look up a single record regardless of archive state.
    pub fn find(&self, key: &RecordKey) -> Result<Option<InventoryRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT collection_id, project_id, build_number, archived, updated_at
             FROM inventory_records
             WHERE collection_id = ?1 AND project_id = ?2 AND build_number = ?3",
        )?;
        let mut rows = stmt.query_map(
            params![
                key.collection_id.0,
                key.project_id.0,
                key.build_number.0
            ],
            RawRow::from_row,
        )?;
        let first = rows.next();
        match first {
            Some(raw) => Ok(Some(raw?.decode()?)),
            None => Ok(None),
        }
    }

    /// Open an existing database. Never creates the file: a missing database
    /// is a data-access failure, not an empty inventory.
    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

impl RecordStore for SqliteStore {
    fn fetch_pending(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT collection_id, project_id, build_number, archived, updated_at
             FROM inventory_records
             WHERE archived = 0",
        )?;
        let raw = stmt
            .query_map([], RawRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawRow::decode).collect()
    }

    fn mark_archived(&self, key: &RecordKey) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let changed = conn.execute(
            "UPDATE inventory_records
             SET archived = 1, updated_at = ?4
             WHERE collection_id = ?1 AND project_id = ?2 AND build_number = ?3
               AND archived = 0",
            params![
                key.collection_id.0,
                key.project_id.0,
                key.build_number.0,
                now
            ],
        )?;
        Ok(changed)
    }
}

/// Row as stored, before timestamp decoding.
struct RawRow {
    collection_id: String,
    project_id: String,
    build_number: String,
    archived: bool,
    updated_at: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            collection_id: row.get(0)?,
            project_id: row.get(1)?,
            build_number: row.get(2)?,
            archived: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn decode(self) -> Result<InventoryRecord, StoreError> {
        let updated_at = parse_timestamp(&self.updated_at).ok_or_else(|| {
            StoreError::Serialization {
                key: format!(
                    "{}/{}#{}",
                    self.collection_id, self.project_id, self.build_number
                ),
                reason: format!("unparseable updated_at '{}'", self.updated_at),
            }
        })?;
        Ok(InventoryRecord {
            collection_id: self.collection_id.into(),
            project_id: self.project_id.into(),
            build_number: self.build_number.into(),
            archived: self.archived,
            updated_at,
        })
    }
}

/// RFC 3339, or SQLite's `CURRENT_TIMESTAMP` shape (`YYYY-MM-DD HH:MM:SS[.fff]`, UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
