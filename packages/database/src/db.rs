//! Database connection utilities.

use std::path::{Path, PathBuf};

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

use crate::{StoreError, ensure_schema};

/// Default location of the `SQLite` database.
pub const DEFAULT_DB_PATH: &str = "data/ev_map.db";

/// Returns the database path from the `DATABASE_PATH` environment
/// variable, falling back to [`DEFAULT_DB_PATH`].
#[must_use]
pub fn path_from_env() -> PathBuf {
    std::env::var("DATABASE_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Opens (or creates) the `SQLite` database at `path` and ensures the
/// schema exists.
///
/// # Errors
///
/// Returns [`StoreError`] if the parent directory cannot be created, the
/// connection fails, or schema creation fails.
pub async fn open(path: &Path) -> Result<Box<dyn Database>, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| StoreError::Connection {
        message: format!("{}: {e}", path.display()),
    })?;

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Opens the database at the path given by `DATABASE_PATH`.
///
/// # Errors
///
/// Returns [`StoreError`] if the database cannot be opened.
pub async fn open_from_env() -> Result<Box<dyn Database>, StoreError> {
    let path = path_from_env();
    log::info!("Opening database at {}", path.display());
    open(&path).await
}
