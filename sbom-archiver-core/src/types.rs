//! Domain types for the SBOM inventory.
//!
//! The identity of a record is the triple (collection, project, build).
//! All three components are opaque strings; comparisons are exact.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Remote system scope a record belongs to (an organisation or collection).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub String);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CollectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Project inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque build version token. `"42"` and `"042"` are different builds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildNumber(pub String);

impl BuildNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BuildNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BuildNumber {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Full identity of an inventory record. Archive updates are keyed on all three parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub collection_id: CollectionId,
    pub project_id: ProjectId,
    pub build_number: BuildNumber,
}

impl RecordKey {
    pub fn new(
        collection_id: impl Into<CollectionId>,
        project_id: impl Into<ProjectId>,
        build_number: impl Into<BuildNumber>,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            project_id: project_id.into(),
            build_number: build_number.into(),
        }
    }
}

/// `collection/project#build`
impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}#{}",
            self.collection_id, self.project_id, self.build_number
        )
    }
}

/// One tracked build artifact as persisted in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub collection_id: CollectionId,
    pub project_id: ProjectId,
    pub build_number: BuildNumber,
    #[serde(default)]
    pub archived: bool,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            collection_id: self.collection_id.clone(),
            project_id: self.project_id.clone(),
            build_number: self.build_number.clone(),
        }
    }
}

/// Insert payload for seeding the store. `archived` and `updated_at` take column defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub key: RecordKey,
}

impl NewRecord {
    pub fn new(
        collection_id: impl Into<CollectionId>,
        project_id: impl Into<ProjectId>,
        build_number: impl Into<BuildNumber>,
    ) -> Self {
        Self {
            key: RecordKey::new(collection_id, project_id, build_number),
        }
    }
}
