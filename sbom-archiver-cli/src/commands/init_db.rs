//! `sbom-archiver init-db`: idempotent schema setup.

use anyhow::{Context, Result};

use sbom_archiver_core::{config::store_url_from_env, SqliteStore};

pub fn run() -> Result<()> {
    let url = store_url_from_env().context("invalid configuration")?;
    let store =
        SqliteStore::from_connection_string(&url).context("invalid store connection string")?;
    store
        .ensure_schema()
        .with_context(|| format!("failed to initialise schema at {}", store.path().display()))?;
    println!("inventory schema ready: {}", store.path().display());
    Ok(())
}
