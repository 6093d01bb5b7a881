//! HTTP handler functions for the EV map API.

use actix_web::{HttpResponse, web};
use ev_map_analytics::{AnalyticsError, pipelines};
use ev_map_analytics_models::DepartmentStatsParams;
use ev_map_server_models::{
    ApiError, ApiHealth, BarChartQuery, CompareQuery, CorrelationQuery, DepartmentStatsQuery,
    EquipmentQuery, MatrixQuery, RankingQuery, SearchQuery,
};
use ev_map_territory_models::TerritoryKind;
use serde::Serialize;

use crate::AppState;

/// Maps an analytics result to a response.
///
/// Not-found and validation errors are the caller's fault and are only
/// logged at `debug`; store failures are logged at `error` and reported as
/// a bad gateway.
fn respond<T: Serialize>(context: &str, result: Result<T, AnalyticsError>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e @ AnalyticsError::NotFound { .. }) => {
            log::debug!("{context}: {e}");
            HttpResponse::NotFound().json(ApiError::new(e.to_string()))
        }
        Err(e @ AnalyticsError::Validation { .. }) => {
            log::debug!("{context}: {e}");
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
        Err(e @ AnalyticsError::Upstream(_)) => {
            log::error!("{context}: {e}");
            HttpResponse::BadGateway().json(ApiError::new(format!("{context}: data source error")))
        }
    }
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(message))
}

fn parse_kind(path: &str) -> Result<TerritoryKind, HttpResponse> {
    path.parse()
        .map_err(|_| bad_request(format!("Unknown territory kind '{path}'")))
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/stats/global`
pub async fn global_stats(state: web::Data<AppState>) -> HttpResponse {
    respond(
        "Failed to compute global stats",
        pipelines::global_stats(state.store.as_ref()).await,
    )
}

/// `GET /api/stats/regions`
pub async fn region_stats(state: web::Data<AppState>) -> HttpResponse {
    respond(
        "Failed to compute region stats",
        pipelines::region_profiles(state.store.as_ref()).await,
    )
}

/// `GET /api/stats/departments`
///
/// Optionally restricted to one region with `?region=`.
pub async fn department_stats(
    state: web::Data<AppState>,
    params: web::Query<DepartmentStatsQuery>,
) -> HttpResponse {
    let params = DepartmentStatsParams {
        region: params.into_inner().region,
    };
    respond(
        "Failed to compute department stats",
        pipelines::department_profiles(state.store.as_ref(), &params).await,
    )
}

/// `GET /api/correlation`
pub async fn correlation(
    state: web::Data<AppState>,
    params: web::Query<CorrelationQuery>,
) -> HttpResponse {
    let params = match params.to_params() {
        Ok(params) => params,
        Err(message) => return bad_request(message),
    };
    respond(
        "Failed to compute correlation",
        pipelines::correlation(state.store.as_ref(), &params).await,
    )
}

/// `GET /api/correlation/matrix`
pub async fn correlation_matrix(
    state: web::Data<AppState>,
    params: web::Query<MatrixQuery>,
) -> HttpResponse {
    let kind = match params.kind() {
        Ok(kind) => kind,
        Err(message) => return bad_request(message),
    };
    respond(
        "Failed to compute correlation matrix",
        pipelines::correlation_matrix(state.store.as_ref(), kind).await,
    )
}

/// `GET /api/equipment`
///
/// Well and under equipped territories around the mean stations per 1000
/// electric vehicles.
pub async fn equipment(
    state: web::Data<AppState>,
    params: web::Query<EquipmentQuery>,
) -> HttpResponse {
    let params = match params.to_params() {
        Ok(params) => params,
        Err(message) => return bad_request(message),
    };
    respond(
        "Failed to classify equipment",
        pipelines::equipment(state.store.as_ref(), &params, &state.config.ranking).await,
    )
}

/// `GET /api/chart/bars`
pub async fn bar_chart(
    state: web::Data<AppState>,
    params: web::Query<BarChartQuery>,
) -> HttpResponse {
    let params = match params.to_params() {
        Ok(params) => params,
        Err(message) => return bad_request(message),
    };
    respond(
        "Failed to build bar chart",
        pipelines::bar_chart(state.store.as_ref(), &params, &state.config.ranking).await,
    )
}

/// `GET /api/top/{kind}`
///
/// `kind` is `communes`, `departments` or `regions`.
pub async fn top(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<RankingQuery>,
) -> HttpResponse {
    let kind = match parse_kind(&path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let params = match params.to_params() {
        Ok(params) => params,
        Err(message) => return bad_request(message),
    };

    let result = if kind == TerritoryKind::Commune {
        pipelines::rank_communes(state.store.as_ref(), &params, &state.config.ranking).await
    } else {
        pipelines::rank_territories(state.store.as_ref(), kind, &params, &state.config.ranking)
            .await
    };
    respond("Failed to rank territories", result)
}

/// `GET /api/compare/{kind}`
///
/// Communes also need `aPostalCode` and `bPostalCode`.
pub async fn compare(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<CompareQuery>,
) -> HttpResponse {
    let kind = match parse_kind(&path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    respond(
        "Failed to compare territories",
        pipelines::compare(state.store.as_ref(), &params.to_params(kind)).await,
    )
}

/// `GET /api/communes/search`
pub async fn search_communes(
    state: web::Data<AppState>,
    params: web::Query<SearchQuery>,
) -> HttpResponse {
    respond(
        "Failed to search communes",
        pipelines::search_communes(
            state.store.as_ref(),
            &params.q,
            params.limit,
            &state.config.ranking,
        )
        .await,
    )
}
