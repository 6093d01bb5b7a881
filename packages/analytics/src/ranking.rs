//! Top-N selection.

use std::cmp::Ordering;

use ev_map_analytics_models::{
    RankingEntry, RankingField, RankingParams, RankingResult, SortDirection,
};
use ev_map_territory_models::{AggregatedStats, TerritoryKind};

use crate::config::RankingConfig;

/// Returns the `limit` items with the highest (or lowest) value.
///
/// Items whose value is `None`, or that fail `guard`, are excluded. The
/// sort is stable, so ties keep their input order.
pub fn top_n<T, I, V, G>(
    items: I,
    value_fn: V,
    direction: SortDirection,
    limit: usize,
    guard: G,
) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    V: Fn(&T) -> Option<f64>,
    G: Fn(&T) -> bool,
{
    let mut scored: Vec<(f64, T)> = items
        .into_iter()
        .filter(|item| guard(item))
        .filter_map(|item| value_fn(&item).map(|v| (v, item)))
        .collect();

    scored.sort_by(|(a, _), (b, _)| {
        let ordering = a.partial_cmp(b).unwrap_or(Ordering::Equal);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    scored.truncate(limit);

    scored.into_iter().map(|(_, item)| item).collect()
}

/// Minimum-sample guard for `field`.
///
/// Count fields are never guarded. Percentages need enough vehicles to be
/// meaningful; ratios need both a station and enough electric vehicles.
#[must_use]
pub const fn passes_guard(
    field: RankingField,
    stats: &AggregatedStats,
    config: &RankingConfig,
    min_vehicles: Option<u64>,
) -> bool {
    match field {
        RankingField::PercentElectric => {
            let min = match min_vehicles {
                Some(min) => min,
                None => config.min_vehicles_for_percentage,
            };
            stats.total_vehicles >= min
        }
        RankingField::VehiclesPerStation | RankingField::StationsPer1000Ev => {
            let min = match min_vehicles {
                Some(min) => min,
                None => config.min_vehicles_for_ratio,
            };
            stats.total_stations >= config.min_stations_for_ratio
                && stats.total_electric_vehicles >= min
        }
        RankingField::ElectricVehicles
        | RankingField::TotalVehicles
        | RankingField::Stations
        | RankingField::ChargingPoints => true,
    }
}

fn describe(
    kind: TerritoryKind,
    params: &RankingParams,
    direction: SortDirection,
    limit: usize,
) -> String {
    let order = match direction {
        SortDirection::Ascending => "lowest",
        SortDirection::Descending => "highest",
    };
    let mut description = format!("Top {limit} {kind}s by {order} {}", params.field);
    if let Some(region) = &params.region {
        description.push_str(&format!(" in region {region}"));
    }
    if let Some(department) = &params.department {
        description.push_str(&format!(" in department {department}"));
    }
    description
}

/// Ranks `territories` by `params.field`.
#[must_use]
pub fn rank(
    kind: TerritoryKind,
    territories: Vec<AggregatedStats>,
    params: &RankingParams,
    config: &RankingConfig,
) -> RankingResult {
    let direction = params.direction.unwrap_or_default();
    let limit = config.clamp_limit(params.limit);
    let field = params.field;

    let guarded = territories
        .iter()
        .filter(|t| !passes_guard(field, t, config, params.min_vehicles))
        .count();
    if guarded > 0 {
        log::debug!("{guarded} {kind} excluded from {field} ranking by the sample guard");
    }

    let top = top_n(
        territories,
        |t| field.value(t).value(),
        direction,
        limit,
        |t| passes_guard(field, t, config, params.min_vehicles),
    );

    let entries = top
        .into_iter()
        .enumerate()
        .filter_map(|(i, territory)| {
            Some(RankingEntry {
                rank: i + 1,
                value: field.value(&territory).value()?,
                territory,
            })
        })
        .collect();

    RankingResult {
        kind,
        field,
        direction,
        entries,
        excluded_by_guard: guarded,
        description: describe(kind, params, direction, limit),
    }
}
