#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the EV map server.
//!
//! Query strings are deserialized into the loose `*Query` structs below
//! and then converted into the typed analytics parameters, so that a bad
//! enum value produces a JSON validation error naming the parameter
//! instead of a bare extractor failure.

use std::str::FromStr;

use ev_map_analytics_models::{
    BarChartParams, CompareParams, CorrelationParams, EquipmentParams, RankingField,
    RankingParams, SortDirection, Variable,
};
use ev_map_territory_models::{TerritoryId, TerritoryKind};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps a message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid value for '{name}': '{value}'"))
}

fn parse_opt<T: FromStr>(name: &str, value: Option<&str>) -> Result<Option<T>, String> {
    value.map(|v| parse(name, v)).transpose()
}

fn kind_or_region(value: Option<&str>) -> Result<TerritoryKind, String> {
    Ok(parse_opt("kind", value)?.unwrap_or(TerritoryKind::Region))
}

/// Query parameters for `GET /api/stats/departments`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStatsQuery {
    /// Only list the departments of this region.
    pub region: Option<String>,
}

/// Query parameters for `GET /api/correlation`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationQuery {
    /// `region` (default) or `department`.
    pub kind: Option<String>,
    /// Horizontal variable.
    pub x: String,
    /// Vertical variable.
    pub y: String,
}

impl CorrelationQuery {
    /// Converts into typed parameters.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first unparseable parameter.
    pub fn to_params(&self) -> Result<CorrelationParams, String> {
        Ok(CorrelationParams {
            kind: kind_or_region(self.kind.as_deref())?,
            x: parse::<Variable>("x", &self.x)?,
            y: parse::<Variable>("y", &self.y)?,
        })
    }
}

/// Query parameters for `GET /api/correlation/matrix`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatrixQuery {
    /// `region` (default) or `department`.
    pub kind: Option<String>,
}

impl MatrixQuery {
    /// Returns the requested territory kind.
    ///
    /// # Errors
    ///
    /// Returns a message if `kind` is not a territory kind.
    pub fn kind(&self) -> Result<TerritoryKind, String> {
        kind_or_region(self.kind.as_deref())
    }
}

/// Query parameters for `GET /api/equipment`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquipmentQuery {
    /// Territory kind (default `region`).
    pub kind: Option<String>,
    /// Maximum entries per list.
    pub limit: Option<usize>,
}

impl EquipmentQuery {
    /// Converts into typed parameters.
    ///
    /// # Errors
    ///
    /// Returns a message if `kind` is not a territory kind.
    pub fn to_params(&self) -> Result<EquipmentParams, String> {
        Ok(EquipmentParams {
            kind: kind_or_region(self.kind.as_deref())?,
            limit: self.limit,
        })
    }
}

/// Query parameters for `GET /api/chart/bars`.
#[derive(Debug, Clone, Deserialize)]
pub struct BarChartQuery {
    /// Territory kind (default `region`).
    pub kind: Option<String>,
    /// Plotted variable.
    pub variable: String,
    /// Number of bars.
    pub limit: Option<usize>,
    /// `asc` or `desc` (default).
    pub direction: Option<String>,
}

impl BarChartQuery {
    /// Converts into typed parameters.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first unparseable parameter.
    pub fn to_params(&self) -> Result<BarChartParams, String> {
        Ok(BarChartParams {
            kind: kind_or_region(self.kind.as_deref())?,
            variable: parse("variable", &self.variable)?,
            limit: self.limit,
            direction: parse_opt("direction", self.direction.as_deref())?,
        })
    }
}

/// Query parameters for `GET /api/top/{kind}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingQuery {
    /// Field to rank by.
    pub field: String,
    /// `asc` or `desc` (default).
    pub direction: Option<String>,
    /// Number of results.
    pub limit: Option<usize>,
    /// Overrides the configured minimum vehicle count.
    pub min_vehicles: Option<u64>,
    /// Restrict to one region.
    pub region: Option<String>,
    /// Restrict to one department.
    pub department: Option<String>,
}

impl RankingQuery {
    /// Converts into typed parameters.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first unparseable parameter.
    pub fn to_params(&self) -> Result<RankingParams, String> {
        Ok(RankingParams {
            field: parse::<RankingField>("field", &self.field)?,
            direction: parse_opt::<SortDirection>("direction", self.direction.as_deref())?,
            limit: self.limit,
            min_vehicles: self.min_vehicles,
            region: self.region.clone(),
            department: self.department.clone(),
        })
    }
}

/// Query parameters for `GET /api/compare/{kind}`.
///
/// `a` and `b` are region names, department codes, or commune names; the
/// postal codes are only read for communes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareQuery {
    /// First territory.
    pub a: String,
    /// Second territory.
    pub b: String,
    /// Postal code of the first commune.
    pub a_postal_code: Option<String>,
    /// Postal code of the second commune.
    pub b_postal_code: Option<String>,
}

impl CompareQuery {
    /// Builds the identifiers for territories of `kind`.
    ///
    /// Identifiers are not validated here; a commune without a postal code
    /// is rejected by the comparison itself.
    #[must_use]
    pub fn to_params(&self, kind: TerritoryKind) -> CompareParams {
        let id = |value: &str, postal_code: Option<&String>| match kind {
            TerritoryKind::Region => TerritoryId::Region {
                name: value.to_string(),
            },
            TerritoryKind::Department => TerritoryId::Department {
                code: value.to_string(),
            },
            TerritoryKind::Commune => TerritoryId::Commune {
                name: value.to_string(),
                postal_code: postal_code.cloned().unwrap_or_default(),
            },
        };

        CompareParams {
            territory1: id(&self.a, self.a_postal_code.as_ref()),
            territory2: id(&self.b, self.b_postal_code.as_ref()),
        }
    }
}

/// Query parameters for `GET /api/communes/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    /// Name or postal code fragment.
    pub q: String,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_kind_defaults_to_region() {
        let query = CorrelationQuery {
            kind: None,
            x: "population".to_string(),
            y: "stationsPer1000Ev".to_string(),
        };
        let params = query.to_params().unwrap();
        assert_eq!(params.kind, TerritoryKind::Region);
        assert_eq!(params.y, Variable::StationsPer1000Ev);
    }

    #[test]
    fn unknown_values_name_the_parameter() {
        let query = RankingQuery {
            field: "happiness".to_string(),
            direction: None,
            limit: None,
            min_vehicles: None,
            region: None,
            department: None,
        };
        let err = query.to_params().unwrap_err();
        assert!(err.contains("'field'"));
    }

    #[test]
    fn plural_kinds_are_accepted() {
        let query = MatrixQuery {
            kind: Some("departments".to_string()),
        };
        assert_eq!(query.kind().unwrap(), TerritoryKind::Department);
    }

    #[test]
    fn commune_comparison_carries_postal_codes() {
        let query = CompareQuery {
            a: "Rennes".to_string(),
            b: "Brest".to_string(),
            a_postal_code: Some("35000".to_string()),
            b_postal_code: None,
        };
        let params = query.to_params(TerritoryKind::Commune);
        assert_eq!(
            params.territory1,
            TerritoryId::Commune {
                name: "Rennes".to_string(),
                postal_code: "35000".to_string(),
            }
        );
        assert!(params.territory2.validate().is_err());
    }
}
