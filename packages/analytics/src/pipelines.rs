//! Async analytics pipelines.
//!
//! Each pipeline reads what it needs from a [`TerritoryStore`], runs the
//! pure engines, and returns a serializable result. Nothing is cached:
//! every call recomputes from the store.

use std::collections::BTreeSet;

use ev_map_analytics_models::{
    BarChartParams, BarSeries, CommuneSearchResult, CompareParams, ComparisonResult,
    CorrelationMatrix, CorrelationParams, CorrelationResult, DepartmentStatsParams,
    EquipmentParams, EquipmentResult, GlobalStats, RankingParams, RankingResult,
    TerritoryStatsResult, Variable,
};
use ev_map_database::store::TerritoryStore;
use ev_map_database_models::CommuneScope;
use ev_map_territory_models::{
    AggregatedStats, Demographics, TerritoryId, TerritoryKind, TerritoryProfile,
    codes,
};

use crate::{
    AnalyticsError, RankingConfig, aggregate, comparison,
    correlation::{self, DEFAULT_EQUIPMENT_LIMIT},
    ranking,
};

fn require_non_blank(value: Option<&str>, what: &str) -> Result<(), AnalyticsError> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(AnalyticsError::validation(format!("{what} must not be blank")))
        }
        _ => Ok(()),
    }
}

fn require_aggregate_kind(kind: TerritoryKind) -> Result<(), AnalyticsError> {
    if kind.has_demographics() {
        Ok(())
    } else {
        Err(AnalyticsError::validation(format!(
            "{kind} is not supported here, use region or department"
        )))
    }
}

/// Commune scope for an optional region or department filter. The
/// department wins when both are given since it is the narrower one.
fn scope_for(region: Option<&str>, department: Option<&str>) -> CommuneScope {
    match (region, department) {
        (_, Some(code)) => CommuneScope::Department(codes::normalize_department_code(code)),
        (Some(name), None) => CommuneScope::Region(name.trim().to_string()),
        (None, None) => CommuneScope::All,
    }
}

fn demographics_in_scope(scope: &CommuneScope, d: &Demographics) -> bool {
    match scope {
        CommuneScope::All => true,
        CommuneScope::Department(code) => d.kind == TerritoryKind::Department && d.code == *code,
        CommuneScope::Region(name) => match d.kind {
            TerritoryKind::Region => codes::same_name(&d.name, name),
            TerritoryKind::Department | TerritoryKind::Commune => d
                .region
                .as_deref()
                .or_else(|| codes::region_for_department(&d.code))
                .is_some_and(|region| codes::same_name(region, name)),
        },
    }
}

/// Aggregates the communes in `scope` into profiles of `kind`.
async fn profiles(
    store: &dyn TerritoryStore,
    kind: TerritoryKind,
    scope: &CommuneScope,
) -> Result<Vec<TerritoryProfile>, AnalyticsError> {
    let communes = store.communes(scope).await?;

    if kind == TerritoryKind::Commune {
        return Ok(communes
            .iter()
            .map(|c| TerritoryProfile::new(AggregatedStats::for_commune(c), None))
            .collect());
    }

    let mut stats = aggregate::aggregate(&communes, kind);
    if kind == TerritoryKind::Region {
        let counts = store.region_vehicle_counts().await?;
        aggregate::apply_region_vehicle_counts(&mut stats, &counts);
    }

    let demographics: Vec<Demographics> = store
        .demographics(kind)
        .await?
        .into_iter()
        .filter(|d| demographics_in_scope(scope, d))
        .collect();

    log::debug!(
        "Built {} {kind} aggregates from {} communes ({} demographics rows)",
        stats.len(),
        communes.len(),
        demographics.len()
    );

    Ok(aggregate::build_profiles(kind, stats, demographics))
}

/// National totals.
///
/// # Errors
///
/// Returns [`AnalyticsError::Upstream`] if the store fails.
pub async fn global_stats(store: &dyn TerritoryStore) -> Result<GlobalStats, AnalyticsError> {
    let communes = store.communes(&CommuneScope::All).await?;
    let totals = aggregate::aggregate_all(&communes);

    let distinct = |kind: TerritoryKind| -> u64 {
        let keys: BTreeSet<String> = communes
            .iter()
            .filter_map(|c| aggregate::group_key(kind, c))
            .collect();
        keys.len() as u64
    };

    let regions = store.demographics(TerritoryKind::Region).await?;
    let population = if regions.is_empty() {
        None
    } else {
        Some(regions.iter().map(|r| r.population).sum())
    };

    Ok(GlobalStats {
        communes_with_stations: communes.iter().filter(|c| c.stations > 0).count() as u64,
        department_count: distinct(TerritoryKind::Department),
        region_count: distinct(TerritoryKind::Region),
        population,
        totals,
    })
}

/// Statistics for every region.
///
/// # Errors
///
/// Returns [`AnalyticsError::Upstream`] if the store fails.
pub async fn region_profiles(
    store: &dyn TerritoryStore,
) -> Result<TerritoryStatsResult, AnalyticsError> {
    Ok(TerritoryStatsResult {
        kind: TerritoryKind::Region,
        territories: profiles(store, TerritoryKind::Region, &CommuneScope::All).await?,
    })
}

/// Statistics for every department, optionally within one region.
///
/// # Errors
///
/// * [`AnalyticsError::Validation`] if the region filter is blank
/// * [`AnalyticsError::Upstream`] if the store fails
pub async fn department_profiles(
    store: &dyn TerritoryStore,
    params: &DepartmentStatsParams,
) -> Result<TerritoryStatsResult, AnalyticsError> {
    require_non_blank(params.region.as_deref(), "region")?;
    let scope = scope_for(params.region.as_deref(), None);
    Ok(TerritoryStatsResult {
        kind: TerritoryKind::Department,
        territories: profiles(store, TerritoryKind::Department, &scope).await?,
    })
}

/// Correlates two variables across regions or departments.
///
/// # Errors
///
/// * [`AnalyticsError::Validation`] if `params.kind` is `commune`
/// * [`AnalyticsError::Upstream`] if the store fails
pub async fn correlation(
    store: &dyn TerritoryStore,
    params: &CorrelationParams,
) -> Result<CorrelationResult, AnalyticsError> {
    require_aggregate_kind(params.kind)?;
    let profiles = profiles(store, params.kind, &CommuneScope::All).await?;

    Ok(CorrelationResult {
        kind: params.kind,
        x: params.x,
        y: params.y,
        x_label: params.x.label().to_string(),
        y_label: params.y.label().to_string(),
        analysis: correlation::analyze(&profiles, params.x, params.y),
    })
}

/// Pairwise correlations between every variable.
///
/// # Errors
///
/// * [`AnalyticsError::Validation`] if `kind` is `commune`
/// * [`AnalyticsError::Upstream`] if the store fails
pub async fn correlation_matrix(
    store: &dyn TerritoryStore,
    kind: TerritoryKind,
) -> Result<CorrelationMatrix, AnalyticsError> {
    require_aggregate_kind(kind)?;
    let profiles = profiles(store, kind, &CommuneScope::All).await?;
    let variables = Variable::all().to_vec();

    Ok(CorrelationMatrix {
        kind,
        cells: correlation::correlation_matrix(&profiles, &variables),
        variables,
    })
}

/// Classifies territories as well or under equipped with charging
/// stations.
///
/// # Errors
///
/// Returns [`AnalyticsError::Upstream`] if the store fails.
pub async fn equipment(
    store: &dyn TerritoryStore,
    params: &EquipmentParams,
    config: &RankingConfig,
) -> Result<EquipmentResult, AnalyticsError> {
    let limit = config.clamp_limit(params.limit.or(Some(DEFAULT_EQUIPMENT_LIMIT)));
    let profiles = profiles(store, params.kind, &CommuneScope::All).await?;

    Ok(EquipmentResult {
        kind: params.kind,
        classification: correlation::classify_equipment(&profiles, limit),
    })
}

/// Bar chart of the territories with the highest (or lowest) value of a
/// variable.
///
/// # Errors
///
/// Returns [`AnalyticsError::Upstream`] if the store fails.
pub async fn bar_chart(
    store: &dyn TerritoryStore,
    params: &BarChartParams,
    config: &RankingConfig,
) -> Result<BarSeries, AnalyticsError> {
    let limit = config.clamp_limit(params.limit);
    let profiles = profiles(store, params.kind, &CommuneScope::All).await?;

    Ok(correlation::bar_series(
        &profiles,
        params.variable,
        limit,
        params.direction.unwrap_or_default(),
    ))
}

/// Top-N communes.
///
/// # Errors
///
/// * [`AnalyticsError::Validation`] if a filter is blank
/// * [`AnalyticsError::Upstream`] if the store fails
pub async fn rank_communes(
    store: &dyn TerritoryStore,
    params: &RankingParams,
    config: &RankingConfig,
) -> Result<RankingResult, AnalyticsError> {
    rank_territories(store, TerritoryKind::Commune, params, config).await
}

/// Top-N territories of any kind.
///
/// # Errors
///
/// * [`AnalyticsError::Validation`] if a filter is blank
/// * [`AnalyticsError::Upstream`] if the store fails
pub async fn rank_territories(
    store: &dyn TerritoryStore,
    kind: TerritoryKind,
    params: &RankingParams,
    config: &RankingConfig,
) -> Result<RankingResult, AnalyticsError> {
    require_non_blank(params.region.as_deref(), "region")?;
    require_non_blank(params.department.as_deref(), "department")?;

    let scope = scope_for(params.region.as_deref(), params.department.as_deref());
    let territories = profiles(store, kind, &scope)
        .await?
        .into_iter()
        .map(|p| p.stats)
        .collect();

    Ok(ranking::rank(kind, territories, params, config))
}

/// Resolves one side of a comparison. `Ok(None)` means the territory has
/// neither commune data nor demographics.
async fn resolve(
    store: &dyn TerritoryStore,
    id: &TerritoryId,
) -> Result<Option<AggregatedStats>, AnalyticsError> {
    let (kind, scope, key) = match id {
        TerritoryId::Commune { name, postal_code } => {
            return Ok(store
                .commune(name, postal_code)
                .await?
                .as_ref()
                .map(AggregatedStats::for_commune));
        }
        TerritoryId::Region { name } => (
            TerritoryKind::Region,
            CommuneScope::Region(name.clone()),
            name.trim().to_lowercase(),
        ),
        TerritoryId::Department { code } => (
            TerritoryKind::Department,
            CommuneScope::Department(code.clone()),
            code.clone(),
        ),
    };

    Ok(profiles(store, kind, &scope)
        .await?
        .into_iter()
        .find(|p| p.stats.key == key)
        .map(|p| p.stats))
}

/// Compares two territories of the same kind.
///
/// Identifiers are validated before anything is fetched. Both sides are
/// then resolved concurrently.
///
/// # Errors
///
/// * [`AnalyticsError::Validation`] if the identifiers are malformed, of
///   different kinds, or designate the same territory
/// * [`AnalyticsError::NotFound`] naming the first side that doesn't exist
/// * [`AnalyticsError::Upstream`] if the store fails
pub async fn compare(
    store: &dyn TerritoryStore,
    params: &CompareParams,
) -> Result<ComparisonResult, AnalyticsError> {
    let kind = comparison::validate_pair(&params.territory1, &params.territory2)?;
    let a = params.territory1.normalized();
    let b = params.territory2.normalized();

    let (first, second) = futures::join!(resolve(store, &a), resolve(store, &b));

    let first = first?.ok_or_else(|| AnalyticsError::not_found(kind, a.to_string()))?;
    let second = second?.ok_or_else(|| AnalyticsError::not_found(kind, b.to_string()))?;

    Ok(comparison::compare_stats(kind, first, second))
}

/// Looks up communes by name or postal code.
///
/// # Errors
///
/// * [`AnalyticsError::Validation`] if `query` is blank
/// * [`AnalyticsError::Upstream`] if the store fails
pub async fn search_communes(
    store: &dyn TerritoryStore,
    query: &str,
    limit: Option<usize>,
    config: &RankingConfig,
) -> Result<CommuneSearchResult, AnalyticsError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AnalyticsError::validation("search query must not be blank"));
    }

    let limit = config.clamp_limit(limit);
    let matches: Vec<AggregatedStats> = store
        .search_communes(query, limit)
        .await?
        .iter()
        .map(AggregatedStats::for_commune)
        .collect();

    Ok(CommuneSearchResult {
        description: format!("{} commune(s) matching '{query}'", matches.len()),
        matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_map_analytics_models::{CorrelationAnalysis, RankingField};
    use ev_map_database::store::MemoryStore;
    use ev_map_territory_models::{CommuneRecord, Indicator, Ratio, RegionVehicleCount};

    fn commune(
        name: &str,
        postal: &str,
        region: &str,
        ev: u64,
        total: u64,
        stations: u64,
    ) -> CommuneRecord {
        CommuneRecord {
            name: name.to_string(),
            postal_code: postal.to_string(),
            department_code: postal[..2].to_string(),
            region: Some(region.to_string()),
            electric_vehicles: ev,
            total_vehicles: total,
            stations,
            charging_points: stations * 2,
        }
    }

    fn demographics(kind: TerritoryKind, code: &str, name: &str, population: u64) -> Demographics {
        Demographics {
            kind,
            code: code.to_string(),
            name: name.to_string(),
            region: None,
            population,
            area_km2: 1_000.0,
            reported_density: None,
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            commune("Paris 1", "75001", "Île-de-France", 10, 100, 2),
            commune("Paris 2", "75002", "Île-de-France", 20, 100, 2),
            commune("Paris 3", "75003", "Île-de-France", 30, 100, 1),
            commune("Rennes", "35000", "Bretagne", 600, 10_000, 30),
            commune("Brest", "29200", "Bretagne", 400, 8_000, 20),
            commune("Ajaccio", "20000", "Corse", 100, 3_000, 50),
            commune("Hameau", "48000", "Occitanie", 5, 5, 0),
        ])
        .with_demographics(vec![
            demographics(TerritoryKind::Region, "Bretagne", "Bretagne", 3_400_000),
            demographics(TerritoryKind::Region, "Corse", "Corse", 340_000),
            demographics(TerritoryKind::Region, "Île-de-France", "Île-de-France", 12_000_000),
            demographics(TerritoryKind::Region, "Occitanie", "Occitanie", 6_000_000),
            demographics(TerritoryKind::Department, "75", "Paris", 2_100_000),
            demographics(TerritoryKind::Department, "35", "Ille-et-Vilaine", 1_100_000),
        ])
    }

    fn region(name: &str) -> TerritoryId {
        TerritoryId::Region {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn global_stats_sum_every_commune() {
        let stats = global_stats(&store()).await.unwrap();
        assert_eq!(stats.totals.commune_count, 7);
        assert_eq!(stats.totals.total_electric_vehicles, 1165);
        assert_eq!(stats.totals.total_stations, 105);
        assert_eq!(stats.communes_with_stations, 6);
        assert_eq!(stats.region_count, 4);
        assert_eq!(stats.department_count, 5);
        assert_eq!(stats.population, Some(21_740_000));
    }

    #[tokio::test]
    async fn paris_department_aggregate() {
        let result = department_profiles(&store(), &DepartmentStatsParams::default())
            .await
            .unwrap();
        let paris = result
            .territories
            .iter()
            .find(|p| p.stats.key == "75")
            .unwrap();
        assert_eq!(paris.stats.name, "Paris");
        assert_eq!(paris.stats.total_electric_vehicles, 60);
        assert!((paris.stats.percent_electric - 20.0).abs() < 1e-9);
        assert_eq!(paris.stats.vehicles_per_station, Ratio::Defined(12.0));
    }

    #[tokio::test]
    async fn departments_filtered_by_region() {
        let params = DepartmentStatsParams {
            region: Some("bretagne".to_string()),
        };
        let result = department_profiles(&store(), &params).await.unwrap();
        let keys: Vec<&str> = result
            .territories
            .iter()
            .map(|p| p.stats.key.as_str())
            .collect();
        assert_eq!(keys, vec!["29", "35"]);

        let blank = DepartmentStatsParams {
            region: Some(" ".to_string()),
        };
        assert!(matches!(
            department_profiles(&store(), &blank).await,
            Err(AnalyticsError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn region_counts_prefer_the_region_dataset() {
        let store = store().with_region_vehicles(vec![RegionVehicleCount {
            region: "Corse".to_string(),
            electric_vehicles: 250,
            total_vehicles: 5_000,
        }]);
        let result = region_profiles(&store).await.unwrap();
        let corse = result
            .territories
            .iter()
            .find(|p| p.stats.name == "Corse")
            .unwrap();
        assert_eq!(corse.stats.total_electric_vehicles, 250);
        assert_eq!(corse.stats.total_stations, 50);
        assert_eq!(corse.stats.vehicles_per_station, Ratio::Defined(5.0));
    }

    #[tokio::test]
    async fn compare_bretagne_with_corse() {
        let store = MemoryStore::new(vec![
            commune("Rennes", "35000", "Bretagne", 1000, 20_000, 50),
            commune("Ajaccio", "20000", "Corse", 100, 3_000, 50),
        ]);
        let params = CompareParams {
            territory1: region("Bretagne"),
            territory2: region("Corse"),
        };
        let result = compare(&store, &params).await.unwrap();
        assert_eq!(result.difference(Indicator::ElectricVehicles), Some(900.0));
        assert_eq!(result.territory1.vehicles_per_station, Ratio::Defined(20.0));
        assert_eq!(result.territory2.vehicles_per_station, Ratio::Defined(2.0));
    }

    #[tokio::test]
    async fn compare_regions_with_coded_demographics() {
        let store = MemoryStore::new(vec![
            commune("Rennes", "35000", "Bretagne", 1000, 20_000, 50),
            commune("Ajaccio", "20000", "Corse", 100, 3_000, 50),
        ])
        .with_demographics(vec![
            demographics(TerritoryKind::Region, "53", "Bretagne", 3_400_000),
            demographics(TerritoryKind::Region, "94", "Corse", 340_000),
        ]);

        let listed = region_profiles(&store).await.unwrap();
        assert_eq!(listed.territories.len(), 2);
        assert!(listed.territories.iter().all(|p| p.demographics.is_some()));

        let params = CompareParams {
            territory1: region("Bretagne"),
            territory2: region("Corse"),
        };
        let result = compare(&store, &params).await.unwrap();
        assert_eq!(result.difference(Indicator::ElectricVehicles), Some(900.0));
        assert_eq!(result.territory1.total_electric_vehicles, 1000);
    }

    #[tokio::test]
    async fn compare_with_itself_is_rejected() {
        let params = CompareParams {
            territory1: region("Bretagne"),
            territory2: region("Bretagne"),
        };
        assert!(matches!(
            compare(&store(), &params).await,
            Err(AnalyticsError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn compare_names_the_missing_side() {
        let params = CompareParams {
            territory1: region("Bretagne"),
            territory2: region("Atlantide"),
        };
        let Err(AnalyticsError::NotFound { kind, identifier }) = compare(&store(), &params).await
        else {
            panic!("expected NotFound");
        };
        assert_eq!(kind, TerritoryKind::Region);
        assert!(identifier.contains("Atlantide"));

        let params = CompareParams {
            territory1: TerritoryId::Commune {
                name: "Nulle-Part".to_string(),
                postal_code: "99999".to_string(),
            },
            territory2: TerritoryId::Commune {
                name: "Also-Missing".to_string(),
                postal_code: "99998".to_string(),
            },
        };
        let Err(AnalyticsError::NotFound { identifier, .. }) = compare(&store(), &params).await
        else {
            panic!("expected NotFound");
        };
        assert!(identifier.contains("Nulle-Part"));
    }

    #[tokio::test]
    async fn compare_communes() {
        let params = CompareParams {
            territory1: TerritoryId::Commune {
                name: "rennes".to_string(),
                postal_code: "35000".to_string(),
            },
            territory2: TerritoryId::Commune {
                name: "Brest".to_string(),
                postal_code: "29200".to_string(),
            },
        };
        let result = compare(&store(), &params).await.unwrap();
        assert_eq!(result.kind, TerritoryKind::Commune);
        assert_eq!(result.difference(Indicator::TotalVehicles), Some(2_000.0));
        assert_eq!(result.difference(Indicator::ChargingStations), Some(10.0));
    }

    #[tokio::test]
    async fn top_communes_by_percentage_respect_the_vehicle_guard() {
        let params = RankingParams {
            limit: Some(3),
            min_vehicles: Some(100),
            ..RankingParams::by(RankingField::PercentElectric)
        };
        let result = rank_communes(&store(), &params, &RankingConfig::default())
            .await
            .unwrap();
        assert_eq!(result.entries.len(), 3);
        assert!(result.entries.iter().all(|e| e.territory.name != "Hameau"));
        assert_eq!(result.entries[0].territory.name, "Paris 3");
    }

    #[tokio::test]
    async fn top_regions_by_stations() {
        let params = RankingParams {
            limit: Some(2),
            ..RankingParams::by(RankingField::Stations)
        };
        let result = rank_territories(
            &store(),
            TerritoryKind::Region,
            &params,
            &RankingConfig::default(),
        )
        .await
        .unwrap();
        let names: Vec<&str> = result
            .entries
            .iter()
            .map(|e| e.territory.name.as_str())
            .collect();
        assert_eq!(names, vec!["Bretagne", "Corse"]);
    }

    #[tokio::test]
    async fn correlation_over_regions() {
        let params = CorrelationParams {
            kind: TerritoryKind::Region,
            x: Variable::Population,
            y: Variable::ElectricVehicles,
        };
        let result = correlation(&store(), &params).await.unwrap();
        let CorrelationAnalysis::Computed { sample_size, .. } = result.analysis else {
            panic!("expected a coefficient");
        };
        assert_eq!(sample_size, 4);

        let communes = CorrelationParams {
            kind: TerritoryKind::Commune,
            ..params
        };
        assert!(matches!(
            correlation(&store(), &communes).await,
            Err(AnalyticsError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn matrix_covers_every_variable() {
        let matrix = correlation_matrix(&store(), TerritoryKind::Department)
            .await
            .unwrap();
        let n = Variable::all().len();
        assert_eq!(matrix.cells.len(), n * n);
    }

    #[tokio::test]
    async fn equipment_over_regions() {
        let params = EquipmentParams {
            kind: TerritoryKind::Region,
            limit: None,
        };
        let result = equipment(&store(), &params, &RankingConfig::default())
            .await
            .unwrap();
        // Occitanie has no stations and is not eligible.
        assert_eq!(result.classification.eligible_count, 3);
        assert_eq!(result.classification.well_equipped[0].name, "Corse");
    }

    #[tokio::test]
    async fn bar_chart_of_regions() {
        let params = BarChartParams {
            kind: TerritoryKind::Region,
            variable: Variable::ElectricVehicles,
            limit: Some(2),
            direction: None,
        };
        let bars = bar_chart(&store(), &params, &RankingConfig::default())
            .await
            .unwrap();
        assert_eq!(bars.labels, vec!["Bretagne", "Corse"]);
    }

    #[tokio::test]
    async fn search_requires_a_query() {
        let config = RankingConfig::default();
        let result = search_communes(&store(), "paris", None, &config).await.unwrap();
        assert_eq!(result.matches.len(), 3);
        assert!(matches!(
            search_communes(&store(), "  ", None, &config).await,
            Err(AnalyticsError::Validation { .. })
        ));
    }
}
