//! SBOM archiver core library.
//!
//! Public API surface:
//! - [`types`]: identity newtypes and [`InventoryRecord`]
//! - [`config`]: [`Settings`] loaded from the process environment
//! - [`store`]: the [`RecordStore`] seam and its SQLite implementation
//! - [`error`]: [`StoreError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{AuthScheme, Settings};
pub use error::{ConfigError, StoreError};
pub use store::{RecordStore, SqliteStore};
pub use types::{BuildNumber, CollectionId, InventoryRecord, NewRecord, ProjectId, RecordKey};
