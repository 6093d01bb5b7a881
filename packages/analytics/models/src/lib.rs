#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parameter and result types for the EV map analytics operations.
//!
//! Every analytics pipeline takes one of the `*Params` types below and
//! returns one of the `*Result` types. All results are JSON-serializable
//! and rebuilt from scratch on every call.

use std::collections::BTreeMap;

use ev_map_territory_models::{
    AggregatedStats, Indicator, Ratio, ScatterPoint, TerritoryId, TerritoryKind, TerritoryProfile,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A numeric variable that can be plotted or correlated across territories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Variable {
    /// Inhabitants.
    Population,
    /// Surface in km².
    Area,
    /// Inhabitants per km².
    Density,
    /// Electric vehicles.
    ElectricVehicles,
    /// Vehicles of any kind.
    TotalVehicles,
    /// Charging stations.
    Stations,
    /// Charging points.
    ChargingPoints,
    /// Share of electric vehicles, 0–100.
    PercentElectric,
    /// Electric vehicles per charging station.
    VehiclesPerStation,
    /// Charging stations per 1000 electric vehicles.
    StationsPer1000Ev,
    /// Electric vehicles per 1000 inhabitants.
    EvPer1000Inhabitants,
    /// Charging stations per 100 km².
    StationsPer100Km2,
}

impl Variable {
    /// Returns all variables in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Population,
            Self::Area,
            Self::Density,
            Self::ElectricVehicles,
            Self::TotalVehicles,
            Self::Stations,
            Self::ChargingPoints,
            Self::PercentElectric,
            Self::VehiclesPerStation,
            Self::StationsPer1000Ev,
            Self::EvPer1000Inhabitants,
            Self::StationsPer100Km2,
        ]
    }

    /// Human-readable axis label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Population => "Population",
            Self::Area => "Superficie (km²)",
            Self::Density => "Densité (hab/km²)",
            Self::ElectricVehicles => "Véhicules électriques",
            Self::TotalVehicles => "Véhicules",
            Self::Stations => "Bornes",
            Self::ChargingPoints => "Points de charge",
            Self::PercentElectric => "Part de véhicules électriques (%)",
            Self::VehiclesPerStation => "Véhicules électriques par borne",
            Self::StationsPer1000Ev => "Bornes pour 1000 véhicules électriques",
            Self::EvPer1000Inhabitants => "Véhicules électriques pour 1000 habitants",
            Self::StationsPer100Km2 => "Bornes pour 100 km²",
        }
    }
}

/// Sort direction for rankings.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SortDirection {
    /// Smallest value first.
    #[strum(to_string = "asc", serialize = "ascending")]
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    /// Largest value first.
    #[default]
    #[strum(to_string = "desc", serialize = "descending")]
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

/// A field territories can be ranked by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum RankingField {
    /// Electric vehicles.
    ElectricVehicles,
    /// Vehicles of any kind.
    TotalVehicles,
    /// Charging stations.
    Stations,
    /// Charging points.
    ChargingPoints,
    /// Share of electric vehicles.
    PercentElectric,
    /// Electric vehicles per charging station.
    VehiclesPerStation,
    /// Charging stations per 1000 electric vehicles.
    StationsPer1000Ev,
}

impl RankingField {
    /// Returns the value of this field for a territory.
    #[must_use]
    pub fn value(self, stats: &AggregatedStats) -> Ratio {
        match self {
            Self::ElectricVehicles => stats.total_electric_vehicles.into(),
            Self::TotalVehicles => stats.total_vehicles.into(),
            Self::Stations => stats.total_stations.into(),
            Self::ChargingPoints => stats.total_charging_points.into(),
            Self::PercentElectric => Ratio::Defined(stats.percent_electric),
            Self::VehiclesPerStation => stats.vehicles_per_station,
            Self::StationsPer1000Ev => stats.stations_per_1000_ev(),
        }
    }
}

/// Totals for the whole country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    /// Sums and derived ratios over every commune.
    #[serde(flatten)]
    pub totals: AggregatedStats,
    /// Communes with at least one charging station.
    pub communes_with_stations: u64,
    /// Distinct departments with commune data.
    pub department_count: u64,
    /// Distinct regions with commune data.
    pub region_count: u64,
    /// Sum of region populations, when demographics are loaded.
    pub population: Option<u64>,
}

/// Parameters for listing department statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStatsParams {
    /// Restrict to the departments of one region.
    pub region: Option<String>,
}

/// Statistics for every territory of one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryStatsResult {
    /// Kind of the listed territories.
    pub kind: TerritoryKind,
    /// One profile per territory, ordered by key.
    pub territories: Vec<TerritoryProfile>,
}

/// Interpretation tier of a correlation coefficient.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CorrelationStrength {
    /// r > 0.7
    StrongPositive,
    /// 0.3 < r ≤ 0.7
    ModeratePositive,
    /// −0.3 ≤ r ≤ 0.3
    Weak,
    /// −0.7 ≤ r < −0.3
    ModerateNegative,
    /// r < −0.7
    StrongNegative,
}

impl CorrelationStrength {
    /// Classifies a coefficient. Callers pass the coefficient as reported
    /// (rounded to two decimals) so the tier matches the displayed value.
    #[must_use]
    pub fn from_coefficient(r: f64) -> Self {
        if r > 0.7 {
            Self::StrongPositive
        } else if r > 0.3 {
            Self::ModeratePositive
        } else if r >= -0.3 {
            Self::Weak
        } else if r >= -0.7 {
            Self::ModerateNegative
        } else {
            Self::StrongNegative
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::StrongPositive => "Corrélation positive forte",
            Self::ModeratePositive => "Corrélation positive modérée",
            Self::Weak => "Corrélation faible ou négligeable",
            Self::ModerateNegative => "Corrélation négative modérée",
            Self::StrongNegative => "Corrélation négative forte",
        }
    }
}

/// Parameters for a two-variable correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationParams {
    /// Territories to correlate over (regions or departments).
    pub kind: TerritoryKind,
    /// Horizontal variable.
    pub x: Variable,
    /// Vertical variable.
    pub y: Variable,
}

/// Outcome of correlating two variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrelationAnalysis {
    /// Both axes are the same variable; the coefficient is trivially 1 and
    /// carries no information.
    IdenticalVariables {
        /// The variable selected on both axes.
        variable: Variable,
        /// Explanation for display.
        message: String,
    },
    /// A coefficient was computed.
    #[serde(rename_all = "camelCase")]
    Computed {
        /// Pearson's r, in [-1, 1].
        coefficient: f64,
        /// Interpretation tier of `coefficient`.
        strength: CorrelationStrength,
        /// Readable form of `strength`.
        interpretation: String,
        /// Number of territories where both variables are defined.
        sample_size: usize,
        /// One point per territory.
        points: Vec<ScatterPoint>,
    },
}

/// Result of a correlation query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationResult {
    /// Territories correlated over.
    pub kind: TerritoryKind,
    /// Horizontal variable.
    pub x: Variable,
    /// Vertical variable.
    pub y: Variable,
    /// Horizontal axis label.
    pub x_label: String,
    /// Vertical axis label.
    pub y_label: String,
    /// The coefficient, or the identical-variables state.
    pub analysis: CorrelationAnalysis,
}

/// One cell of a correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationCell {
    /// Row variable.
    pub x: Variable,
    /// Column variable.
    pub y: Variable,
    /// Pearson's r; `None` on the diagonal.
    pub coefficient: Option<f64>,
    /// Interpretation tier; `None` on the diagonal.
    pub strength: Option<CorrelationStrength>,
    /// Readable form of `strength`; `None` on the diagonal.
    pub interpretation: Option<String>,
    /// Number of territories where both variables are defined.
    pub sample_size: usize,
}

/// Pairwise correlations between a set of variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    /// Territories correlated over.
    pub kind: TerritoryKind,
    /// Variables, in row/column order.
    pub variables: Vec<Variable>,
    /// Row-major cells (`variables.len()²` of them).
    pub cells: Vec<CorrelationCell>,
}

/// Parameters for the equipment classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentParams {
    /// Territories to classify.
    pub kind: TerritoryKind,
    /// Maximum entries per list.
    pub limit: Option<usize>,
}

/// A territory's charging equipment level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentEntry {
    /// Territory key.
    pub key: String,
    /// Territory name.
    pub name: String,
    /// Charging stations per 1000 electric vehicles.
    pub ratio: f64,
    /// Electric vehicles.
    pub electric_vehicles: u64,
    /// Charging stations.
    pub stations: u64,
}

/// Territories split around the mean equipment ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentClassification {
    /// Mean ratio over eligible territories (undefined if none).
    pub mean_ratio: Ratio,
    /// Territories with both electric vehicles and stations.
    pub eligible_count: usize,
    /// Size of the full well-equipped partition.
    pub well_equipped_count: usize,
    /// Size of the full under-equipped partition.
    pub under_equipped_count: usize,
    /// Ratio ≥ mean, best first.
    pub well_equipped: Vec<EquipmentEntry>,
    /// Ratio < mean, worst first.
    pub under_equipped: Vec<EquipmentEntry>,
}

/// Equipment classification for one territory kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentResult {
    /// Kind of the classified territories.
    pub kind: TerritoryKind,
    /// The classification.
    #[serde(flatten)]
    pub classification: EquipmentClassification,
}

/// Parameters for a top-N ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingParams {
    /// Field to rank by.
    pub field: RankingField,
    /// Sort direction (default descending).
    pub direction: Option<SortDirection>,
    /// Number of results.
    pub limit: Option<usize>,
    /// Overrides the configured minimum vehicle count.
    pub min_vehicles: Option<u64>,
    /// Restrict to one region.
    pub region: Option<String>,
    /// Restrict to one department.
    pub department: Option<String>,
}

impl RankingParams {
    /// Ranks by `field` with every other option left at its default.
    #[must_use]
    pub const fn by(field: RankingField) -> Self {
        Self {
            field,
            direction: None,
            limit: None,
            min_vehicles: None,
            region: None,
            department: None,
        }
    }
}

/// One ranked territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    /// 1-based position.
    pub rank: usize,
    /// Value of the ranked field.
    pub value: f64,
    /// The territory's statistics.
    pub territory: AggregatedStats,
}

/// Result of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResult {
    /// Kind of the ranked territories.
    pub kind: TerritoryKind,
    /// Field ranked by.
    pub field: RankingField,
    /// Sort direction.
    pub direction: SortDirection,
    /// Ranked territories.
    pub entries: Vec<RankingEntry>,
    /// Territories excluded by the minimum-sample guard.
    pub excluded_by_guard: usize,
    /// Description of the ranking criteria.
    pub description: String,
}

/// Parameters for a bar chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChartParams {
    /// Territories to plot.
    pub kind: TerritoryKind,
    /// Plotted variable.
    pub variable: Variable,
    /// Number of bars.
    pub limit: Option<usize>,
    /// Sort direction (default descending).
    pub direction: Option<SortDirection>,
}

/// Data for a bar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarSeries {
    /// Plotted variable.
    pub variable: Variable,
    /// Axis label.
    pub label: String,
    /// One label per bar.
    pub labels: Vec<String>,
    /// One value per bar.
    pub values: Vec<f64>,
}

/// Parameters for comparing two territories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareParams {
    /// First territory.
    pub territory1: TerritoryId,
    /// Second territory.
    pub territory2: TerritoryId,
}

/// Difference between two territories on one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorDifference {
    /// Compared indicator.
    pub indicator: Indicator,
    /// Value for the first territory.
    pub value1: Ratio,
    /// Value for the second territory.
    pub value2: Ratio,
    /// `value1 - value2`, when both are defined.
    pub difference: Option<f64>,
}

/// Side-by-side comparison of two territories of the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Kind of both territories.
    pub kind: TerritoryKind,
    /// First territory.
    pub territory1: AggregatedStats,
    /// Second territory.
    pub territory2: AggregatedStats,
    /// Difference per indicator, keyed by indicator name (`null` when
    /// either side is undefined).
    pub differences: BTreeMap<String, Option<f64>>,
    /// Per-indicator detail, in display order.
    pub indicators: Vec<IndicatorDifference>,
}

impl ComparisonResult {
    /// Returns the difference for `indicator`, if it was compared and both
    /// sides were defined.
    #[must_use]
    pub fn difference(&self, indicator: Indicator) -> Option<f64> {
        self.indicators
            .iter()
            .find(|d| d.indicator == indicator)
            .and_then(|d| d.difference)
    }
}

/// Result of a commune search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommuneSearchResult {
    /// Matching communes with their statistics.
    pub matches: Vec<AggregatedStats>,
    /// Human-readable description of the search.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_thresholds_are_exclusive() {
        use CorrelationStrength::{
            ModerateNegative, ModeratePositive, StrongNegative, StrongPositive, Weak,
        };
        assert_eq!(CorrelationStrength::from_coefficient(0.71), StrongPositive);
        assert_eq!(CorrelationStrength::from_coefficient(0.7), ModeratePositive);
        assert_eq!(CorrelationStrength::from_coefficient(0.31), ModeratePositive);
        assert_eq!(CorrelationStrength::from_coefficient(0.3), Weak);
        assert_eq!(CorrelationStrength::from_coefficient(0.0), Weak);
        assert_eq!(CorrelationStrength::from_coefficient(-0.3), Weak);
        assert_eq!(CorrelationStrength::from_coefficient(-0.31), ModerateNegative);
        assert_eq!(CorrelationStrength::from_coefficient(-0.7), ModerateNegative);
        assert_eq!(CorrelationStrength::from_coefficient(-0.71), StrongNegative);
    }

    #[test]
    fn variables_parse_from_camel_case() {
        assert_eq!(
            "evPer1000Inhabitants".parse::<Variable>().unwrap(),
            Variable::EvPer1000Inhabitants
        );
        assert_eq!(Variable::PercentElectric.to_string(), "percentElectric");
        assert_eq!(
            serde_json::to_string(&Variable::StationsPer100Km2).unwrap(),
            "\"stationsPer100Km2\""
        );
    }

    #[test]
    fn sort_direction_accepts_short_and_long_forms() {
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Ascending);
        assert_eq!(
            "Descending".parse::<SortDirection>().unwrap(),
            SortDirection::Descending
        );
        assert_eq!(SortDirection::default(), SortDirection::Descending);
    }

    #[test]
    fn identical_variables_serialize_with_status_tag() {
        let analysis = CorrelationAnalysis::IdenticalVariables {
            variable: Variable::Stations,
            message: "same".to_string(),
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["status"], "identical_variables");
        assert_eq!(json["variable"], "stations");
    }
}
