#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the EV map.
//!
//! Serves the analytics pipelines as JSON under `/api`. Data is read from
//! the `SQLite` database at `DATABASE_PATH`, or from a JSON dataset file
//! when `EV_MAP_DATASET` is set.

mod handlers;
pub mod interactive;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use ev_map_analytics::AnalyticsConfig;
use ev_map_database::{
    StoreError, db,
    store::{MemoryStore, SqlStore, TerritoryStore},
};

/// Shared application state.
pub struct AppState {
    /// Source data.
    pub store: Arc<dyn TerritoryStore>,
    /// Ranking thresholds and limits.
    pub config: Arc<AnalyticsConfig>,
}

/// Opens the configured territory store.
///
/// Uses the JSON dataset named by `EV_MAP_DATASET` when set, the `SQLite`
/// database otherwise.
///
/// # Errors
///
/// Returns [`StoreError`] if the dataset or database cannot be opened.
pub async fn open_store() -> Result<Arc<dyn TerritoryStore>, StoreError> {
    if let Ok(path) = std::env::var("EV_MAP_DATASET")
        && !path.trim().is_empty()
    {
        log::info!("Loading dataset from {path}");
        return Ok(Arc::new(MemoryStore::from_json_file(Path::new(&path))?));
    }

    let db = db::open_from_env().await?;
    Ok(Arc::new(SqlStore::new(Arc::from(db))))
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/stats/global", web::get().to(handlers::global_stats))
            .route("/stats/regions", web::get().to(handlers::region_stats))
            .route("/stats/departments", web::get().to(handlers::department_stats))
            .route("/correlation", web::get().to(handlers::correlation))
            .route(
                "/correlation/matrix",
                web::get().to(handlers::correlation_matrix),
            )
            .route("/equipment", web::get().to(handlers::equipment))
            .route("/chart/bars", web::get().to(handlers::bar_chart))
            .route("/top/{kind}", web::get().to(handlers::top))
            .route("/compare/{kind}", web::get().to(handlers::compare))
            .route("/communes/search", web::get().to(handlers::search_communes)),
    );
}

/// Starts the EV map API server.
///
/// Opens the store, loads the analytics configuration, and starts the
/// Actix-Web HTTP server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the store or configuration cannot
/// be loaded, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let store = open_store().await.map_err(|e| {
        log::error!("Failed to open store: {e}");
        std::io::Error::other(e.to_string())
    })?;

    let config = AnalyticsConfig::from_env().map_err(|e| {
        log::error!("{e}");
        std::io::Error::other(e.to_string())
    })?;

    let state = web::Data::new(AppState {
        store,
        config: Arc::new(config),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
