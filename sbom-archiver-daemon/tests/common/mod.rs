//! In-memory store and scripted oracle shared by the reconciler tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use sbom_archiver_core::{InventoryRecord, RecordKey, RecordStore, StoreError};
use sbom_archiver_oracle::{ActivityOracle, OracleError};
use tokio_util::sync::CancellationToken;

pub fn record(collection: &str, project: &str, build: &str) -> InventoryRecord {
    InventoryRecord {
        collection_id: collection.into(),
        project_id: project.into(),
        build_number: build.into(),
        archived: false,
        updated_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<InventoryRecord>>,
    failing_fetches: AtomicUsize,
    fetch_calls: AtomicUsize,
    failing_archive: Mutex<Option<RecordKey>>,
}

impl MemoryStore {
    pub fn with_records(records: Vec<InventoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// The next `n` fetches fail with a decode error.
    pub fn fail_next_fetches(&self, n: usize) {
        self.failing_fetches.store(n, Ordering::SeqCst);
    }

    pub fn fail_archive_for(&self, key: RecordKey) {
        *self.failing_archive.lock().expect("lock") = Some(key);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn is_archived(&self, key: &RecordKey) -> bool {
        self.records
            .lock()
            .expect("lock")
            .iter()
            .find(|r| &r.key() == key)
            .map(|r| r.archived)
            .expect("record present")
    }
}

impl RecordStore for MemoryStore {
    fn fetch_pending(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_fetches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_fetches.store(failing - 1, Ordering::SeqCst);
            return Err(StoreError::Serialization {
                key: "C1/P1#10".to_string(),
                reason: "simulated outage".to_string(),
            });
        }
        Ok(self
            .records
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| !r.archived)
            .cloned()
            .collect())
    }

    fn mark_archived(&self, key: &RecordKey) -> Result<usize, StoreError> {
        if self.failing_archive.lock().expect("lock").as_ref() == Some(key) {
            return Err(StoreError::InvalidConnectionString("simulated".to_string()));
        }
        let mut records = self.records.lock().expect("lock");
        let mut changed = 0;
        for r in records.iter_mut() {
            if &r.key() == key && !r.archived {
                r.archived = true;
                r.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Answer {
    /// Artifact versions currently released for the project.
    Versions(Vec<String>),
    /// Non-success HTTP status.
    Fail(u16),
    Panic,
}

pub fn versions(list: &[&str]) -> Answer {
    Answer::Versions(list.iter().map(|v| v.to_string()).collect())
}

#[derive(Default)]
pub struct ScriptedOracle {
    answers: HashMap<(String, String), Answer>,
    calls: Mutex<Vec<RecordKey>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_on_call: Option<CancellationToken>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, collection: &str, project: &str, answer: Answer) -> Self {
        self.answers
            .insert((collection.to_string(), project.to_string()), answer);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<RecordKey> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ActivityOracle for ScriptedOracle {
    fn is_build_active(&self, key: &RecordKey) -> Result<bool, OracleError> {
        self.calls.lock().expect("lock").push(key.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scope = (key.collection_id.0.clone(), key.project_id.0.clone());
        match self.answers.get(&scope) {
            Some(Answer::Versions(list)) => Ok(list.iter().any(|v| v == key.build_number.as_str())),
            Some(Answer::Fail(status)) => Err(OracleError::Status {
                status: *status,
                body: "scripted failure".to_string(),
            }),
            Some(Answer::Panic) => panic!("scripted oracle panic for {key}"),
            None => Ok(false),
        }
    }
}
