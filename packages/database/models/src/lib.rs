#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Raw row types and query scopes for the EV map storage layer.
//!
//! Rows are read as loosely-typed as the source tables are: every column
//! may be missing. Each row type has a `validate` method that turns it
//! into the corresponding `ev_map_territory_models` record. Additive
//! counts default to `0`; identity columns never default and reject the
//! row instead.

use ev_map_territory_models::{
    CommuneRecord, Demographics, RegionVehicleCount, TerritoryKind, codes,
};
use serde::{Deserialize, Serialize};

/// Selects which communes a query returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "value", rename_all = "snake_case")]
pub enum CommuneScope {
    /// Every commune.
    All,
    /// Communes of one department, by code.
    Department(String),
    /// Communes of one region, by name.
    Region(String),
}

/// A row rejected at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// Source table of the row.
    pub table: &'static str,
    /// Why the row was rejected.
    pub reason: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid row in {}: {}", self.table, self.reason)
    }
}

impl std::error::Error for SchemaError {}

/// A commune row joined from the vehicle and charging-station tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommuneRow {
    /// Commune name.
    pub commune: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Department code.
    pub department_code: Option<String>,
    /// Region name.
    pub region: Option<String>,
    /// Registered electric vehicles.
    pub electric_vehicles: Option<i64>,
    /// Registered vehicles of any kind.
    pub total_vehicles: Option<i64>,
    /// Charging stations in the commune.
    pub stations: Option<i64>,
    /// Charging points in the commune.
    pub charging_points: Option<i64>,
}

impl CommuneRow {
    /// Source table name, for diagnostics.
    pub const TABLE: &'static str = "vehicules_communes";

    /// Validates the row into a [`CommuneRecord`].
    ///
    /// A missing department code is derived from the postal code, and a
    /// missing region from the department code. When the total vehicle
    /// count is below the electric vehicle count, the total is raised to
    /// match.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the commune name or postal code is
    /// missing, or if no department code can be determined.
    pub fn validate(self) -> Result<CommuneRecord, SchemaError> {
        let reject = |reason: String| SchemaError {
            table: Self::TABLE,
            reason,
        };

        let name = non_blank(self.commune).ok_or_else(|| reject("missing commune name".into()))?;
        let postal_code = non_blank(self.postal_code)
            .ok_or_else(|| reject(format!("missing postal code for '{name}'")))?;

        let department_code = non_blank(self.department_code)
            .map(|c| codes::normalize_department_code(&c))
            .or_else(|| codes::department_from_postal_code(&postal_code))
            .ok_or_else(|| reject(format!("no department code for '{name}' ({postal_code})")))?;

        let region = non_blank(self.region)
            .or_else(|| codes::region_for_department(&department_code).map(str::to_string));

        let electric_vehicles = count(self.electric_vehicles);
        let total_vehicles = count(self.total_vehicles).max(electric_vehicles);

        Ok(CommuneRecord {
            name,
            postal_code,
            department_code,
            region,
            electric_vehicles,
            total_vehicles,
            stations: count(self.stations),
            charging_points: count(self.charging_points),
        })
    }
}

/// A row of the departments or regions demographics table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicsRow {
    /// Department code or region name.
    pub code: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Parent region (departments only).
    pub region: Option<String>,
    /// Inhabitants.
    pub population: Option<i64>,
    /// Surface in km².
    pub area_km2: Option<f64>,
    /// Published density.
    pub density: Option<f64>,
}

impl DemographicsRow {
    /// Validates the row for the given territory kind.
    ///
    /// Region rows may omit the code column; the name is then used as the
    /// key.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the row has no usable key.
    pub fn validate(self, kind: TerritoryKind) -> Result<Demographics, SchemaError> {
        let table = match kind {
            TerritoryKind::Region => "regions",
            TerritoryKind::Department | TerritoryKind::Commune => "departements",
        };

        let name = non_blank(self.name);
        let code = match kind {
            TerritoryKind::Region => non_blank(self.code).or_else(|| name.clone()),
            TerritoryKind::Department | TerritoryKind::Commune => {
                non_blank(self.code).map(|c| codes::normalize_department_code(&c))
            }
        }
        .ok_or_else(|| SchemaError {
            table,
            reason: format!("missing {kind} key"),
        })?;

        let region = match kind {
            TerritoryKind::Region => None,
            TerritoryKind::Department | TerritoryKind::Commune => non_blank(self.region)
                .or_else(|| codes::region_for_department(&code).map(str::to_string)),
        };

        Ok(Demographics {
            kind,
            name: name.unwrap_or_else(|| code.clone()),
            code,
            region,
            population: count(self.population),
            area_km2: self.area_km2.filter(|a| a.is_finite() && *a > 0.0).unwrap_or(0.0),
            reported_density: self.density.filter(|d| d.is_finite() && *d >= 0.0),
        })
    }
}

/// A row of the per-region vehicle table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionVehicleRow {
    /// Region name.
    pub region: Option<String>,
    /// Registered electric vehicles.
    pub electric_vehicles: Option<i64>,
    /// Registered vehicles of any kind.
    pub total_vehicles: Option<i64>,
}

impl RegionVehicleRow {
    /// Source table name, for diagnostics.
    pub const TABLE: &'static str = "vehicules_regions";

    /// Validates the row into a [`RegionVehicleCount`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the region name is missing.
    pub fn validate(self) -> Result<RegionVehicleCount, SchemaError> {
        let region = non_blank(self.region).ok_or_else(|| SchemaError {
            table: Self::TABLE,
            reason: "missing region name".to_string(),
        })?;
        let electric_vehicles = count(self.electric_vehicles);

        Ok(RegionVehicleCount {
            region,
            electric_vehicles,
            total_vehicles: count(self.total_vehicles).max(electric_vehicles),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[allow(clippy::cast_sign_loss)]
fn count(value: Option<i64>) -> u64 {
    value.map_or(0, |v| v.max(0) as u64)
}
