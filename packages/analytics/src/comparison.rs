//! Side-by-side comparison of two territories.

use std::collections::BTreeMap;

use ev_map_analytics_models::{ComparisonResult, IndicatorDifference};
use ev_map_territory_models::{AggregatedStats, TerritoryId, TerritoryKind};

use crate::AnalyticsError;

/// Checks that two identifiers can be compared.
///
/// Both must be well formed, of the same kind, and designate different
/// territories.
///
/// # Errors
///
/// Returns [`AnalyticsError::Validation`] describing the first problem.
pub fn validate_pair(a: &TerritoryId, b: &TerritoryId) -> Result<TerritoryKind, AnalyticsError> {
    if a.kind() != b.kind() {
        return Err(AnalyticsError::validation(format!(
            "Cannot compare a {} with a {}",
            a.kind(),
            b.kind()
        )));
    }

    for id in [a, b] {
        id.validate()
            .map_err(|e| AnalyticsError::validation(e.to_string()))?;
    }

    if a.same_territory(b) {
        return Err(AnalyticsError::validation(format!(
            "Cannot compare {a} with itself"
        )));
    }

    Ok(a.kind())
}

/// Computes the per-indicator differences between two territories.
///
/// `difference(a, b) == -difference(b, a)` for every indicator defined on
/// both sides.
#[must_use]
pub fn compare_stats(
    kind: TerritoryKind,
    territory1: AggregatedStats,
    territory2: AggregatedStats,
) -> ComparisonResult {
    let indicators: Vec<IndicatorDifference> = kind
        .indicators()
        .iter()
        .map(|&indicator| {
            let value1 = territory1.indicator(indicator);
            let value2 = territory2.indicator(indicator);
            IndicatorDifference {
                indicator,
                value1,
                value2,
                difference: value1.difference(value2),
            }
        })
        .collect();

    let differences: BTreeMap<String, Option<f64>> = indicators
        .iter()
        .map(|d| (d.indicator.to_string(), d.difference))
        .collect();

    ComparisonResult {
        kind,
        territory1,
        territory2,
        differences,
        indicators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_map_territory_models::{Indicator, Ratio, Totals};

    fn region(name: &str, ev: u64, stations: u64, total: u64) -> AggregatedStats {
        AggregatedStats::from_totals(
            TerritoryKind::Region,
            name.to_lowercase(),
            name,
            Totals {
                communes: 10,
                stations,
                charging_points: stations * 3,
                electric_vehicles: ev,
                total_vehicles: total,
            },
        )
    }

    fn region_id(name: &str) -> TerritoryId {
        TerritoryId::Region {
            name: name.to_string(),
        }
    }

    #[test]
    fn bretagne_against_corse() {
        let result = compare_stats(
            TerritoryKind::Region,
            region("Bretagne", 1000, 50, 20_000),
            region("Corse", 100, 50, 5_000),
        );
        assert_eq!(result.difference(Indicator::ElectricVehicles), Some(900.0));
        assert_eq!(result.differences["totalVehiculesElectriques"], Some(900.0));
        assert_eq!(result.territory1.vehicles_per_station, Ratio::Defined(20.0));
        assert_eq!(result.territory2.vehicles_per_station, Ratio::Defined(2.0));
        assert_eq!(result.difference(Indicator::VehiclesPerStation), Some(18.0));
        assert_eq!(result.difference(Indicator::ChargingStations), Some(0.0));
        assert!(!result.differences.contains_key("totalVehicules"));
    }

    #[test]
    fn differences_are_antisymmetric() {
        let a = region("A", 1234, 17, 9000);
        let b = region("B", 321, 40, 4000);
        let ab = compare_stats(TerritoryKind::Region, a.clone(), b.clone());
        let ba = compare_stats(TerritoryKind::Region, b, a);
        for (x, y) in ab.indicators.iter().zip(&ba.indicators) {
            assert_eq!(x.difference, y.difference.map(|d| -d));
        }
    }

    #[test]
    fn undefined_side_has_no_difference() {
        let result = compare_stats(
            TerritoryKind::Region,
            region("A", 100, 0, 1000),
            region("B", 100, 10, 1000),
        );
        assert_eq!(result.difference(Indicator::VehiclesPerStation), None);
        assert_eq!(result.differences["ratioVehiculesParBorne"], None);
        assert_eq!(result.difference(Indicator::ElectricVehicles), Some(0.0));
    }

    #[test]
    fn communes_also_compare_total_vehicles() {
        let result = compare_stats(
            TerritoryKind::Commune,
            region("A", 100, 1, 1000),
            region("B", 50, 1, 400),
        );
        assert_eq!(result.difference(Indicator::TotalVehicles), Some(600.0));
    }

    #[test]
    fn a_territory_cannot_be_compared_with_itself() {
        let err = validate_pair(&region_id("Bretagne"), &region_id(" bretagne ")).unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation { .. }));
    }

    #[test]
    fn kinds_must_match() {
        let err = validate_pair(
            &region_id("Bretagne"),
            &TerritoryId::Department {
                code: "35".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Cannot compare"));
    }

    #[test]
    fn communes_need_a_postal_code() {
        let err = validate_pair(
            &TerritoryId::Commune {
                name: "Rennes".to_string(),
                postal_code: String::new(),
            },
            &TerritoryId::Commune {
                name: "Brest".to_string(),
                postal_code: "29200".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("postal code"));
    }
}
