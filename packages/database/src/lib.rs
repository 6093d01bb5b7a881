#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Storage layer for the EV map.
//!
//! The four source datasets (charging stations, per-commune vehicle
//! counts, per-region vehicle counts, department/region demographics) live
//! in a `SQLite` database accessed through `switchy_database`. The
//! analytics engine never touches SQL directly: it reads validated records
//! through the [`store::TerritoryStore`] trait.

pub mod db;
pub mod queries;
pub mod store;

use switchy_database::Database;

/// Errors that can occur while reading from storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The database could not be opened.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Filesystem error while opening the database or a dataset file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dataset file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Creates the source tables if they don't already exist.
///
/// Loading data into these tables is done by external tooling; the API
/// only reads them.
///
/// # Errors
///
/// Returns [`StoreError`] if any statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), StoreError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS bornes (
            id_station       TEXT PRIMARY KEY,
            nom_station      TEXT,
            commune          TEXT,
            code_postal      TEXT,
            code_departement TEXT,
            region           TEXT,
            nbre_pdc         INTEGER,
            longitude        REAL,
            latitude         REAL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS vehicules_communes (
            commune                TEXT,
            code_postal            TEXT,
            code_departement       TEXT,
            region                 TEXT,
            nb_vp_rechargeables_el INTEGER,
            nb_vp                  INTEGER
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS vehicules_regions (
            region                 TEXT,
            nb_vp_rechargeables_el INTEGER,
            nb_vp                  INTEGER
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS departements (
            code           TEXT,
            nom            TEXT,
            region         TEXT,
            population     INTEGER,
            superficie_km2 REAL,
            densite        REAL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS regions (
            code           TEXT,
            nom            TEXT,
            population     INTEGER,
            superficie_km2 REAL,
            densite        REAL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_bornes_commune
         ON bornes (code_postal, commune)",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_vehicules_communes_postal
         ON vehicules_communes (code_postal)",
    )
    .await?;

    log::debug!("Storage schema verified");
    Ok(())
}
