//! Correlation engine.
//!
//! Pure functions over [`TerritoryProfile`] slices: Pearson coefficients,
//! scatter points, correlation matrices, the charging equipment
//! classification, and bar chart series.

use ev_map_analytics_models::{
    BarSeries, CorrelationAnalysis, CorrelationCell, CorrelationStrength, EquipmentClassification,
    EquipmentEntry, SortDirection, Variable,
};
use ev_map_territory_models::{Ratio, ScatterPoint, TerritoryProfile, round2};

use crate::ranking::top_n;

/// Default number of entries per equipment list.
pub const DEFAULT_EQUIPMENT_LIMIT: usize = 10;

/// Pearson's correlation coefficient between `x` and `y`.
///
/// Returns `0` for fewer than two points or when either series is
/// constant. Unequal lengths are truncated to the shorter series. The
/// result is clamped to `[-1, 1]` and is never `NaN`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }

    let (x, y) = (&x[..n], &y[..n]);
    if is_constant(x) || is_constant(y) {
        return 0.0;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut ss_x = 0.0;
    let mut ss_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        covariance += dx * dy;
        ss_x += dx * dx;
        ss_y += dy * dy;
    }

    if ss_x == 0.0 || ss_y == 0.0 {
        return 0.0;
    }

    let r = covariance / (ss_x * ss_y).sqrt();
    if r.is_finite() { r.clamp(-1.0, 1.0) } else { 0.0 }
}

/// `true` when every value equals the first. Deviations from a computed
/// mean are not exact for fractional values, so this compares the values.
#[allow(clippy::float_cmp)]
fn is_constant(values: &[f64]) -> bool {
    values.split_first().is_none_or(|(first, rest)| rest.iter().all(|v| v == first))
}

/// Value of `variable` for one territory.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn variable_value(profile: &TerritoryProfile, variable: Variable) -> Ratio {
    let stats = &profile.stats;
    let demographics = profile.demographics.as_ref();
    match variable {
        Variable::Population => demographics.map_or(Ratio::Undefined, |d| d.population.into()),
        Variable::Area => demographics.map_or(Ratio::Undefined, |d| Ratio::from_value(d.area_km2)),
        Variable::Density => demographics
            .and_then(ev_map_territory_models::Demographics::density)
            .map_or(Ratio::Undefined, Ratio::from_value),
        Variable::ElectricVehicles => stats.total_electric_vehicles.into(),
        Variable::TotalVehicles => stats.total_vehicles.into(),
        Variable::Stations => stats.total_stations.into(),
        Variable::ChargingPoints => stats.total_charging_points.into(),
        Variable::PercentElectric => Ratio::Defined(stats.percent_electric),
        Variable::VehiclesPerStation => stats.vehicles_per_station,
        Variable::StationsPer1000Ev => stats.stations_per_1000_ev(),
        Variable::EvPer1000Inhabitants => profile.ev_per_1000_inhabitants,
        Variable::StationsPer100Km2 => profile.stations_per_100_km2,
    }
}

/// One point per territory where both variables are defined.
#[must_use]
pub fn scatter_points(profiles: &[TerritoryProfile], x: Variable, y: Variable) -> Vec<ScatterPoint> {
    profiles
        .iter()
        .filter_map(|p| {
            let x = variable_value(p, x).value()?;
            let y = variable_value(p, y).value()?;
            Some(ScatterPoint {
                x,
                y,
                label: p.label().to_string(),
            })
        })
        .collect()
}

fn coefficient(points: &[ScatterPoint]) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p.x, p.y)).unzip();
    pearson(&xs, &ys)
}

/// Correlates two variables across territories.
///
/// Selecting the same variable on both axes yields
/// [`CorrelationAnalysis::IdenticalVariables`] rather than a trivial
/// coefficient of 1.
#[must_use]
pub fn analyze(profiles: &[TerritoryProfile], x: Variable, y: Variable) -> CorrelationAnalysis {
    if x == y {
        return CorrelationAnalysis::IdenticalVariables {
            variable: x,
            message: format!(
                "« {} » est sélectionnée sur les deux axes : choisissez deux variables différentes",
                x.label()
            ),
        };
    }

    let points = scatter_points(profiles, x, y);
    let r = coefficient(&points);
    log::debug!("Correlation {x} / {y}: r={r:.4} over {} territories", points.len());

    let coefficient = round2(r);
    let strength = CorrelationStrength::from_coefficient(coefficient);
    CorrelationAnalysis::Computed {
        coefficient,
        strength,
        interpretation: strength.description().to_string(),
        sample_size: points.len(),
        points,
    }
}

/// Coefficients for every ordered pair of `variables`, row-major.
///
/// Diagonal cells carry no coefficient.
#[must_use]
pub fn correlation_matrix(
    profiles: &[TerritoryProfile],
    variables: &[Variable],
) -> Vec<CorrelationCell> {
    let mut cells = Vec::with_capacity(variables.len() * variables.len());

    for &x in variables {
        for &y in variables {
            let cell = match analyze(profiles, x, y) {
                CorrelationAnalysis::IdenticalVariables { .. } => CorrelationCell {
                    x,
                    y,
                    coefficient: None,
                    strength: None,
                    interpretation: None,
                    sample_size: profiles
                        .iter()
                        .filter(|p| variable_value(p, x).is_defined())
                        .count(),
                },
                CorrelationAnalysis::Computed {
                    coefficient,
                    strength,
                    interpretation,
                    sample_size,
                    ..
                } => CorrelationCell {
                    x,
                    y,
                    coefficient: Some(coefficient),
                    strength: Some(strength),
                    interpretation: Some(interpretation),
                    sample_size,
                },
            };
            cells.push(cell);
        }
    }

    cells
}

/// Splits territories around the mean stations-per-1000-EV ratio.
///
/// Only territories with both electric vehicles and stations are eligible.
/// The mean and the partition use unrounded ratios; only the reported
/// values are rounded. Each list is truncated to `limit` after
/// partitioning; the counts report the full partitions.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn classify_equipment(profiles: &[TerritoryProfile], limit: usize) -> EquipmentClassification {
    let eligible: Vec<EquipmentEntry> = profiles
        .iter()
        .filter(|p| p.stats.total_electric_vehicles > 0 && p.stats.total_stations > 0)
        .filter_map(|p| {
            let ratio = p.stats.stations_per_1000_ev_exact().value()?;
            Some(EquipmentEntry {
                key: p.stats.key.clone(),
                name: p.stats.name.clone(),
                ratio,
                electric_vehicles: p.stats.total_electric_vehicles,
                stations: p.stats.total_stations,
            })
        })
        .collect();

    if eligible.is_empty() {
        return EquipmentClassification {
            mean_ratio: Ratio::Undefined,
            eligible_count: 0,
            well_equipped_count: 0,
            under_equipped_count: 0,
            well_equipped: Vec::new(),
            under_equipped: Vec::new(),
        };
    }

    let eligible_count = eligible.len();
    let mean = eligible.iter().map(|e| e.ratio).sum::<f64>() / eligible_count as f64;

    let (well, under): (Vec<_>, Vec<_>) = eligible.into_iter().partition(|e| e.ratio >= mean);
    let well_equipped_count = well.len();
    let under_equipped_count = under.len();

    let well_equipped = top_n(
        well,
        |e| Some(e.ratio),
        SortDirection::Descending,
        limit,
        |_| true,
    );
    let under_equipped = top_n(
        under,
        |e| Some(e.ratio),
        SortDirection::Ascending,
        limit,
        |_| true,
    );

    EquipmentClassification {
        mean_ratio: Ratio::Defined(mean).rounded(),
        eligible_count,
        well_equipped_count,
        under_equipped_count,
        well_equipped: well_equipped.into_iter().map(round_entry).collect(),
        under_equipped: under_equipped.into_iter().map(round_entry).collect(),
    }
}

fn round_entry(entry: EquipmentEntry) -> EquipmentEntry {
    EquipmentEntry {
        ratio: round2(entry.ratio),
        ..entry
    }
}

/// Builds a bar chart of the `limit` territories with the highest (or
/// lowest) value of `variable`.
#[must_use]
pub fn bar_series(
    profiles: &[TerritoryProfile],
    variable: Variable,
    limit: usize,
    direction: SortDirection,
) -> BarSeries {
    let top = top_n(
        profiles.iter(),
        |p| variable_value(p, variable).value(),
        direction,
        limit,
        |_| true,
    );

    let (labels, values) = top
        .into_iter()
        .filter_map(|p| Some((p.label().to_string(), variable_value(p, variable).value()?)))
        .unzip();

    BarSeries {
        variable,
        label: variable.label().to_string(),
        labels,
        values,
    }
}
