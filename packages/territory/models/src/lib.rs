#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Territory types for the EV map.
//!
//! These types describe French administrative territories (communes,
//! departments, regions), the validated per-commune records the analytics
//! engine consumes, and the aggregated statistics it produces. They are
//! read-only views rebuilt on every request.

pub mod codes;
pub mod ratio;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use ratio::{Ratio, percentage, round2};

/// The three kinds of territory the API aggregates over.
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
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum TerritoryKind {
    /// Top-level administrative division.
    #[strum(to_string = "region", serialize = "regions")]
    Region,
    /// Intermediate division grouping communes.
    #[strum(to_string = "department", serialize = "departments")]
    Department,
    /// Municipality, the smallest division.
    #[strum(to_string = "commune", serialize = "communes")]
    Commune,
}

impl TerritoryKind {
    /// Returns the indicators compared between two territories of this kind.
    ///
    /// Communes additionally compare their total vehicle count.
    #[must_use]
    pub const fn indicators(self) -> &'static [Indicator] {
        match self {
            Self::Region | Self::Department => &[
                Indicator::ElectricVehicles,
                Indicator::ChargingStations,
                Indicator::ChargingPoints,
                Indicator::VehiclesPerStation,
                Indicator::PercentElectric,
            ],
            Self::Commune => &[
                Indicator::ElectricVehicles,
                Indicator::ChargingStations,
                Indicator::ChargingPoints,
                Indicator::VehiclesPerStation,
                Indicator::PercentElectric,
                Indicator::TotalVehicles,
            ],
        }
    }

    /// Whether demographic data (population, area) exists for this kind.
    #[must_use]
    pub const fn has_demographics(self) -> bool {
        matches!(self, Self::Region | Self::Department)
    }
}

/// A numeric indicator compared between two territories.
///
/// Serialized with the same names as the corresponding
/// [`AggregatedStats`] fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
pub enum Indicator {
    /// Number of electric vehicles.
    #[serde(rename = "totalVehiculesElectriques")]
    #[strum(to_string = "totalVehiculesElectriques")]
    ElectricVehicles,
    /// Number of charging stations.
    #[serde(rename = "totalBornes")]
    #[strum(to_string = "totalBornes")]
    ChargingStations,
    /// Number of charging points.
    #[serde(rename = "totalPointsCharge")]
    #[strum(to_string = "totalPointsCharge")]
    ChargingPoints,
    /// Electric vehicles per charging station.
    #[serde(rename = "ratioVehiculesParBorne")]
    #[strum(to_string = "ratioVehiculesParBorne")]
    VehiclesPerStation,
    /// Share of electric vehicles in the fleet, 0–100.
    #[serde(rename = "pourcentageElectriques")]
    #[strum(to_string = "pourcentageElectriques")]
    PercentElectric,
    /// Number of vehicles of any kind.
    #[serde(rename = "totalVehicules")]
    #[strum(to_string = "totalVehicules")]
    TotalVehicles,
}

/// Identifies a single territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerritoryId {
    /// A region, by name.
    Region {
        /// Region name (e.g. "Bretagne").
        name: String,
    },
    /// A department, by code.
    Department {
        /// Department code (e.g. "75", "2A", "974").
        code: String,
    },
    /// A commune, by name and postal code. Commune names are not unique
    /// nationwide, so the postal code is required.
    Commune {
        /// Commune name.
        name: String,
        /// Five-digit postal code.
        #[serde(rename = "postalCode")]
        postal_code: String,
    },
}

impl TerritoryId {
    /// Returns the kind of territory this identifier refers to.
    #[must_use]
    pub const fn kind(&self) -> TerritoryKind {
        match self {
            Self::Region { .. } => TerritoryKind::Region,
            Self::Department { .. } => TerritoryKind::Department,
            Self::Commune { .. } => TerritoryKind::Commune,
        }
    }

    /// Returns a copy with whitespace trimmed and the department code
    /// normalized.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            Self::Region { name } => Self::Region {
                name: name.trim().to_string(),
            },
            Self::Department { code } => Self::Department {
                code: codes::normalize_department_code(code),
            },
            Self::Commune { name, postal_code } => Self::Commune {
                name: name.trim().to_string(),
                postal_code: postal_code.trim().to_string(),
            },
        }
    }

    /// Checks that every part of the identifier is present and well formed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTerritoryId`] describing the first problem found.
    pub fn validate(&self) -> Result<(), InvalidTerritoryId> {
        let invalid = |reason: &str| InvalidTerritoryId {
            kind: self.kind(),
            reason: reason.to_string(),
        };

        match self {
            Self::Region { name } => {
                if name.trim().is_empty() {
                    return Err(invalid("region name is required"));
                }
            }
            Self::Department { code } => {
                let code = codes::normalize_department_code(code);
                if code.is_empty() {
                    return Err(invalid("department code is required"));
                }
                if !codes::is_department_code(&code) {
                    return Err(invalid(&format!("'{code}' is not a department code")));
                }
            }
            Self::Commune { name, postal_code } => {
                if name.trim().is_empty() {
                    return Err(invalid("commune name is required"));
                }
                let postal_code = postal_code.trim();
                if postal_code.is_empty() {
                    return Err(invalid(&format!(
                        "postal code is required for commune '{}'",
                        name.trim()
                    )));
                }
                if !codes::is_postal_code(postal_code) {
                    return Err(invalid(&format!(
                        "'{postal_code}' is not a five-digit postal code"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Returns `true` if both identifiers designate the same territory.
    #[must_use]
    pub fn same_territory(&self, other: &Self) -> bool {
        match (self.normalized(), other.normalized()) {
            (Self::Region { name: a }, Self::Region { name: b }) => codes::same_name(&a, &b),
            (Self::Department { code: a }, Self::Department { code: b }) => a == b,
            (
                Self::Commune {
                    name: a,
                    postal_code: pa,
                },
                Self::Commune {
                    name: b,
                    postal_code: pb,
                },
            ) => pa == pb && codes::same_name(&a, &b),
            _ => false,
        }
    }
}

impl std::fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Region { name } => write!(f, "region '{name}'"),
            Self::Department { code } => write!(f, "department '{code}'"),
            Self::Commune { name, postal_code } => write!(f, "commune '{name}' ({postal_code})"),
        }
    }
}

/// Error returned when a [`TerritoryId`] is missing a part or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTerritoryId {
    /// Kind of the rejected identifier.
    pub kind: TerritoryKind,
    /// What is wrong with it.
    pub reason: String,
}

impl std::fmt::Display for InvalidTerritoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} identifier: {}", self.kind, self.reason)
    }
}

impl std::error::Error for InvalidTerritoryId {}

/// A validated commune-level record joining vehicle counts and charging
/// infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommuneRecord {
    /// Commune name.
    pub name: String,
    /// Five-digit postal code.
    pub postal_code: String,
    /// Code of the department the commune belongs to.
    pub department_code: String,
    /// Name of the region the commune belongs to, when known.
    pub region: Option<String>,
    /// Registered electric vehicles.
    pub electric_vehicles: u64,
    /// Registered vehicles of any kind (always `>= electric_vehicles`).
    pub total_vehicles: u64,
    /// Charging stations located in the commune.
    pub stations: u64,
    /// Charging points across those stations.
    pub charging_points: u64,
}

/// Population and surface data for a department or region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    /// Whether this row describes a department or a region.
    pub kind: TerritoryKind,
    /// Department code, or region name for regions.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Parent region name (departments only).
    pub region: Option<String>,
    /// Number of inhabitants.
    pub population: u64,
    /// Surface in square kilometres.
    pub area_km2: f64,
    /// Density as published by the source, if any.
    pub reported_density: Option<f64>,
}

impl Demographics {
    /// Inhabitants per km², preferring the published figure.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn density(&self) -> Option<f64> {
        self.reported_density
            .or_else(|| Ratio::from_division(self.population as f64, self.area_km2).value())
    }
}

/// Vehicle counts from the per-region dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionVehicleCount {
    /// Region name.
    pub region: String,
    /// Registered electric vehicles.
    pub electric_vehicles: u64,
    /// Registered vehicles of any kind.
    pub total_vehicles: u64,
}

/// Running sums over a set of communes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Number of communes summed.
    pub communes: u64,
    /// Charging stations.
    pub stations: u64,
    /// Charging points.
    pub charging_points: u64,
    /// Electric vehicles.
    pub electric_vehicles: u64,
    /// Vehicles of any kind.
    pub total_vehicles: u64,
}

impl Totals {
    /// Adds one commune to the running sums.
    pub const fn add(&mut self, commune: &CommuneRecord) {
        self.communes += 1;
        self.stations += commune.stations;
        self.charging_points += commune.charging_points;
        self.electric_vehicles += commune.electric_vehicles;
        self.total_vehicles += commune.total_vehicles;
    }
}

/// Statistics for one territory, summed over its communes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStats {
    /// Kind of territory.
    pub kind: TerritoryKind,
    /// Grouping key (department code, region name, or postal code).
    pub key: String,
    /// Display name.
    pub name: String,
    /// Number of communes summed into this record.
    pub commune_count: u64,
    /// Charging stations.
    #[serde(rename = "totalBornes")]
    pub total_stations: u64,
    /// Charging points.
    #[serde(rename = "totalPointsCharge")]
    pub total_charging_points: u64,
    /// Electric vehicles.
    #[serde(rename = "totalVehiculesElectriques")]
    pub total_electric_vehicles: u64,
    /// Vehicles of any kind.
    #[serde(rename = "totalVehicules")]
    pub total_vehicles: u64,
    /// Share of electric vehicles, 0–100 (`0` when there are no vehicles).
    #[serde(rename = "pourcentageElectriques")]
    pub percent_electric: f64,
    /// Electric vehicles per charging station.
    #[serde(rename = "ratioVehiculesParBorne")]
    pub vehicles_per_station: Ratio,
}

impl AggregatedStats {
    /// Builds the derived fields from raw sums.
    #[must_use]
    pub fn from_totals(
        kind: TerritoryKind,
        key: impl Into<String>,
        name: impl Into<String>,
        totals: Totals,
    ) -> Self {
        Self {
            kind,
            key: key.into(),
            name: name.into(),
            commune_count: totals.communes,
            total_stations: totals.stations,
            total_charging_points: totals.charging_points,
            total_electric_vehicles: totals.electric_vehicles,
            total_vehicles: totals.total_vehicles,
            percent_electric: percentage(totals.electric_vehicles, totals.total_vehicles),
            vehicles_per_station: Ratio::from_counts(totals.electric_vehicles, totals.stations)
                .rounded(),
        }
    }

    /// Builds the record for a single commune.
    #[must_use]
    pub fn for_commune(commune: &CommuneRecord) -> Self {
        let mut totals = Totals::default();
        totals.add(commune);
        Self::from_totals(
            TerritoryKind::Commune,
            commune.postal_code.clone(),
            commune.name.clone(),
            totals,
        )
    }

    /// Returns the raw sums back out of this record.
    #[must_use]
    pub const fn totals(&self) -> Totals {
        Totals {
            communes: self.commune_count,
            stations: self.total_stations,
            charging_points: self.total_charging_points,
            electric_vehicles: self.total_electric_vehicles,
            total_vehicles: self.total_vehicles,
        }
    }

    /// Charging stations per 1000 electric vehicles, rounded for display.
    #[must_use]
    pub fn stations_per_1000_ev(&self) -> Ratio {
        self.stations_per_1000_ev_exact().rounded()
    }

    /// Charging stations per 1000 electric vehicles, unrounded.
    #[must_use]
    pub fn stations_per_1000_ev_exact(&self) -> Ratio {
        Ratio::from_counts(self.total_stations, self.total_electric_vehicles).scaled(1000.0)
    }

    /// Returns the value of `indicator` for this territory.
    #[must_use]
    pub fn indicator(&self, indicator: Indicator) -> Ratio {
        match indicator {
            Indicator::ElectricVehicles => self.total_electric_vehicles.into(),
            Indicator::ChargingStations => self.total_stations.into(),
            Indicator::ChargingPoints => self.total_charging_points.into(),
            Indicator::VehiclesPerStation => self.vehicles_per_station,
            Indicator::PercentElectric => Ratio::Defined(self.percent_electric),
            Indicator::TotalVehicles => self.total_vehicles.into(),
        }
    }
}

/// Aggregated statistics joined with demographics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryProfile {
    /// Summed counts and derived ratios.
    #[serde(flatten)]
    pub stats: AggregatedStats,
    /// Population and surface, when published for this territory.
    pub demographics: Option<Demographics>,
    /// Electric vehicles per 1000 inhabitants.
    pub ev_per_1000_inhabitants: Ratio,
    /// Charging stations per 100 km².
    pub stations_per_100_km2: Ratio,
}

impl TerritoryProfile {
    /// Joins `stats` with `demographics`, computing the per-capita and
    /// per-surface ratios.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(stats: AggregatedStats, demographics: Option<Demographics>) -> Self {
        let (ev_per_1000_inhabitants, stations_per_100_km2) =
            demographics.as_ref().map_or((Ratio::Undefined, Ratio::Undefined), |d| {
                (
                    Ratio::from_division(stats.total_electric_vehicles as f64, d.population as f64)
                        .scaled(1000.0)
                        .rounded(),
                    Ratio::from_division(stats.total_stations as f64, d.area_km2)
                        .scaled(100.0)
                        .rounded(),
                )
            });

        Self {
            stats,
            demographics,
            ev_per_1000_inhabitants,
            stations_per_100_km2,
        }
    }

    /// Display label used in charts.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.stats.name
    }
}

/// One point of a scatter chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    /// Value of the horizontal variable.
    pub x: f64,
    /// Value of the vertical variable.
    pub y: f64,
    /// Territory name.
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commune(ev: u64, total: u64, stations: u64) -> CommuneRecord {
        CommuneRecord {
            name: "Rennes".to_string(),
            postal_code: "35000".to_string(),
            department_code: "35".to_string(),
            region: Some("Bretagne".to_string()),
            electric_vehicles: ev,
            total_vehicles: total,
            stations,
            charging_points: stations * 2,
        }
    }

    #[test]
    fn kind_parses_singular_and_plural() {
        assert_eq!("region".parse::<TerritoryKind>().unwrap(), TerritoryKind::Region);
        assert_eq!(
            "Departments".parse::<TerritoryKind>().unwrap(),
            TerritoryKind::Department
        );
        assert_eq!(TerritoryKind::Commune.to_string(), "commune");
        assert!("county".parse::<TerritoryKind>().is_err());
    }

    #[test]
    fn communes_compare_total_vehicles() {
        assert!(
            TerritoryKind::Commune
                .indicators()
                .contains(&Indicator::TotalVehicles)
        );
        assert!(
            !TerritoryKind::Region
                .indicators()
                .contains(&Indicator::TotalVehicles)
        );
    }

    #[test]
    fn commune_id_requires_postal_code() {
        let id = TerritoryId::Commune {
            name: "Rennes".to_string(),
            postal_code: "  ".to_string(),
        };
        let err = id.validate().unwrap_err();
        assert_eq!(err.kind, TerritoryKind::Commune);
        assert!(err.reason.contains("postal code is required"));
    }

    #[test]
    fn department_id_is_normalized_before_validation() {
        let id = TerritoryId::Department {
            code: "2a".to_string(),
        };
        assert!(id.validate().is_ok());
        assert!(id.same_territory(&TerritoryId::Department {
            code: "2A".to_string()
        }));
    }

    #[test]
    fn region_ids_match_case_insensitively() {
        let a = TerritoryId::Region {
            name: "Bretagne".to_string(),
        };
        let b = TerritoryId::Region {
            name: " BRETAGNE".to_string(),
        };
        assert!(a.same_territory(&b));
    }

    #[test]
    fn stats_with_no_vehicles_and_no_stations() {
        let stats = AggregatedStats::for_commune(&commune(0, 0, 0));
        assert!((stats.percent_electric - 0.0).abs() < f64::EPSILON);
        assert_eq!(stats.vehicles_per_station, Ratio::Undefined);
        assert_eq!(stats.stations_per_1000_ev(), Ratio::Undefined);
    }

    #[test]
    fn stats_serialize_with_dashboard_field_names() {
        let stats = AggregatedStats::for_commune(&commune(10, 40, 0));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalVehiculesElectriques"], 10);
        assert_eq!(json["pourcentageElectriques"], 25.0);
        assert_eq!(json["ratioVehiculesParBorne"], "N/A");
        assert_eq!(json["kind"], "commune");
    }

    #[test]
    fn profile_without_demographics_has_undefined_rates() {
        let stats = AggregatedStats::for_commune(&commune(10, 40, 2));
        let profile = TerritoryProfile::new(stats, None);
        assert_eq!(profile.ev_per_1000_inhabitants, Ratio::Undefined);
        assert_eq!(profile.stations_per_100_km2, Ratio::Undefined);
    }

    #[test]
    fn density_falls_back_to_population_over_area() {
        let demographics = Demographics {
            kind: TerritoryKind::Department,
            code: "35".to_string(),
            name: "Ille-et-Vilaine".to_string(),
            region: Some("Bretagne".to_string()),
            population: 1000,
            area_km2: 10.0,
            reported_density: None,
        };
        assert_eq!(demographics.density(), Some(100.0));
        let empty = Demographics {
            area_km2: 0.0,
            ..demographics
        };
        assert_eq!(empty.density(), None);
    }
}
