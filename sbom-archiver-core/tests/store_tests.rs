//! SQLite record store integration tests: pending reads, targeted archive
//! updates, idempotence, and data-access failure surfaces.

use rusqlite::{params, Connection};
use sbom_archiver_core::{
    store::TABLE, NewRecord, RecordKey, RecordStore, SqliteStore, StoreError,
};
use tempfile::TempDir;

fn seeded_store(dir: &TempDir, records: &[(&str, &str, &str)]) -> SqliteStore {
    let store = SqliteStore::new(dir.path().join("inventory.db"));
    store.ensure_schema().expect("schema");
    for (collection, project, build) in records {
        store
            .insert_record(&NewRecord::new(*collection, *project, *build))
            .expect("insert");
    }
    store
}

fn pending_keys(store: &SqliteStore) -> Vec<RecordKey> {
    let mut keys: Vec<RecordKey> = store
        .fetch_pending()
        .expect("fetch pending")
        .iter()
        .map(|r| r.key())
        .collect();
    keys.sort_by_key(|k| k.to_string());
    keys
}

// ---------------------------------------------------------------------------
// 1. fetch_pending
// ---------------------------------------------------------------------------

#[test]
fn empty_inventory_yields_empty_pending_set() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[]);
    assert!(store.fetch_pending().expect("fetch").is_empty());
}

#[test]
fn fetch_pending_returns_only_unarchived_records() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[("C1", "P1", "10"), ("C1", "P2", "11")]);
    store
        .mark_archived(&RecordKey::new("C1", "P2", "11"))
        .expect("archive");

    assert_eq!(pending_keys(&store), vec![RecordKey::new("C1", "P1", "10")]);
}

#[test]
fn fetched_records_carry_default_flags_and_timestamp() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[("C1", "P1", "10")]);
    let records = store.fetch_pending().expect("fetch");
    assert_eq!(records.len(), 1);
    assert!(!records[0].archived);
    let age = chrono::Utc::now() - records[0].updated_at;
    assert!(age.num_minutes() < 5, "updated_at should default to now");
}

#[test]
fn sqlite_current_timestamp_shape_is_accepted() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[]);
    let conn = Connection::open(store.path()).expect("open");
    conn.execute(
        &format!(
            "INSERT INTO {TABLE} (collection_id, project_id, build_number, updated_at)
             VALUES ('C1', 'P1', '10', '2024-01-02 03:04:05')"
        ),
        [],
    )
    .expect("insert");

    let records = store.fetch_pending().expect("fetch");
    assert_eq!(records[0].updated_at.to_rfc3339(), "2024-01-02T03:04:05+00:00");
}

#[test]
fn malformed_timestamp_is_a_serialization_error_naming_the_record() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[]);
    let conn = Connection::open(store.path()).expect("open");
    conn.execute(
        &format!(
            "INSERT INTO {TABLE} (collection_id, project_id, build_number, updated_at)
             VALUES (?1, ?2, ?3, 'not-a-date')"
        ),
        params!["C1", "P1", "10"],
    )
    .expect("insert");

    let err = store.fetch_pending().unwrap_err();
    assert!(matches!(err, StoreError::Serialization { .. }), "got: {err}");
    assert!(err.to_string().contains("C1/P1#10"), "got: {err}");
}

#[test]
fn missing_database_file_is_a_data_access_error() {
    let dir = TempDir::new().expect("tempdir");
    let store = SqliteStore::new(dir.path().join("absent.db"));
    let err = store.fetch_pending().unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)), "got: {err}");
    assert!(
        !dir.path().join("absent.db").exists(),
        "reads must not create the database"
    );
}

#[test]
fn missing_table_is_a_data_access_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("inventory.db");
    Connection::open(&path).expect("create empty db");
    let err = SqliteStore::new(&path).fetch_pending().unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. mark_archived
// ---------------------------------------------------------------------------

#[test]
fn mark_archived_is_targeted_and_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(
        &dir,
        &[("C1", "P1", "10"), ("C1", "P2", "11"), ("C2", "P1", "10")],
    );
    let key = RecordKey::new("C1", "P1", "10");

    assert_eq!(store.mark_archived(&key).expect("first"), 1);
    assert_eq!(store.mark_archived(&key).expect("second"), 0);

    let archived = store.find(&key).expect("find").expect("present");
    assert!(archived.archived);
    assert_eq!(
        pending_keys(&store),
        vec![RecordKey::new("C1", "P2", "11"), RecordKey::new("C2", "P1", "10")]
    );
}

#[test]
fn mark_archived_requires_exact_build_number() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[("C1", "P1", "42")]);

    assert_eq!(
        store
            .mark_archived(&RecordKey::new("C1", "P1", "042"))
            .expect("update"),
        0
    );
    assert_eq!(pending_keys(&store).len(), 1);
}

#[test]
fn mark_archived_bumps_updated_at() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[]);
    let conn = Connection::open(store.path()).expect("open");
    conn.execute(
        &format!(
            "INSERT INTO {TABLE} (collection_id, project_id, build_number, updated_at)
             VALUES ('C1', 'P1', '10', '2020-01-01T00:00:00Z')"
        ),
        [],
    )
    .expect("insert");

    let key = RecordKey::new("C1", "P1", "10");
    store.mark_archived(&key).expect("archive");
    let record = store.find(&key).expect("find").expect("present");
    assert!(record.updated_at.timestamp() > 1_577_836_800);
}

#[test]
fn live_records_cannot_collide_on_collection_and_project() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[("C1", "P1", "10")]);
    let err = store
        .insert_record(&NewRecord::new("C1", "P1", "12"))
        .unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)), "got: {err}");

    store
        .mark_archived(&RecordKey::new("C1", "P1", "10"))
        .expect("archive");
    store
        .insert_record(&NewRecord::new("C1", "P1", "12"))
        .expect("new live build after archive");
}

#[test]
fn ensure_schema_is_repeatable() {
    let dir = TempDir::new().expect("tempdir");
    let store = seeded_store(&dir, &[("C1", "P1", "10")]);
    store.ensure_schema().expect("second ensure");
    assert_eq!(store.fetch_pending().expect("fetch").len(), 1);
}
