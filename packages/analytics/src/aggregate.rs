//! Territory aggregation.
//!
//! Reduces commune records into per-department, per-region, or national
//! totals and joins them with demographics.

use std::collections::BTreeMap;

use ev_map_territory_models::{
    AggregatedStats, CommuneRecord, Demographics, RegionVehicleCount, TerritoryKind,
    TerritoryProfile, Totals, codes,
};

/// Grouping key of a commune for the given territory kind.
///
/// Region keys are case-folded so that "Bretagne" and "BRETAGNE" land in
/// the same group.
#[must_use]
pub fn group_key(kind: TerritoryKind, commune: &CommuneRecord) -> Option<String> {
    match kind {
        TerritoryKind::Region => commune.region.as_deref().map(|r| r.trim().to_lowercase()),
        TerritoryKind::Department => Some(commune.department_code.clone()),
        TerritoryKind::Commune => Some(format!(
            "{}:{}",
            commune.postal_code,
            commune.name.trim().to_lowercase()
        )),
    }
}

/// Display name of a commune's group.
fn group_name(kind: TerritoryKind, commune: &CommuneRecord) -> String {
    match kind {
        TerritoryKind::Region => commune.region.clone().unwrap_or_default(),
        TerritoryKind::Department => commune.department_code.clone(),
        TerritoryKind::Commune => commune.name.clone(),
    }
}

/// Sums communes into one [`AggregatedStats`] per group.
///
/// `key_fn` picks the group of each commune; communes for which it returns
/// `None` are left out of every group. The output does not depend on the
/// order of `communes`.
pub fn aggregate_by<'a, I, F>(
    communes: I,
    kind: TerritoryKind,
    key_fn: F,
) -> BTreeMap<String, AggregatedStats>
where
    I: IntoIterator<Item = &'a CommuneRecord>,
    F: Fn(&CommuneRecord) -> Option<String>,
{
    let mut groups: BTreeMap<String, (String, Totals)> = BTreeMap::new();
    let mut ungrouped = 0usize;

    for commune in communes {
        let Some(key) = key_fn(commune) else {
            ungrouped += 1;
            continue;
        };

        let (name, totals) = groups
            .entry(key)
            .or_insert_with(|| (group_name(kind, commune), Totals::default()));

        // Keep the smallest name so the label is independent of input order.
        let candidate = group_name(kind, commune);
        if candidate < *name {
            *name = candidate;
        }
        totals.add(commune);
    }

    if ungrouped > 0 {
        log::debug!("{ungrouped} commune(s) have no {kind} key and were not grouped");
    }

    groups
        .into_iter()
        .map(|(key, (name, totals))| {
            let stats = AggregatedStats::from_totals(kind, key.clone(), name, totals);
            (key, stats)
        })
        .collect()
}

/// Sums communes by department code or region name.
#[must_use]
pub fn aggregate(communes: &[CommuneRecord], kind: TerritoryKind) -> Vec<AggregatedStats> {
    aggregate_by(communes, kind, |c| group_key(kind, c))
        .into_values()
        .collect()
}

/// Sums every commune into a single national record.
#[must_use]
pub fn aggregate_all(communes: &[CommuneRecord]) -> AggregatedStats {
    let totals = communes.iter().fold(Totals::default(), |mut totals, c| {
        totals.add(c);
        totals
    });
    AggregatedStats::from_totals(TerritoryKind::Region, "france", "France", totals)
}

/// Replaces the vehicle counts of region aggregates with the per-region
/// vehicle dataset, where it has a row for the region.
///
/// Station and charging point counts are left as summed from communes.
pub fn apply_region_vehicle_counts(regions: &mut [AggregatedStats], counts: &[RegionVehicleCount]) {
    for stats in regions.iter_mut() {
        let Some(count) = counts
            .iter()
            .find(|c| codes::same_name(&c.region, &stats.name))
        else {
            continue;
        };

        let totals = Totals {
            electric_vehicles: count.electric_vehicles,
            total_vehicles: count.total_vehicles,
            ..stats.totals()
        };
        *stats = AggregatedStats::from_totals(
            stats.kind,
            std::mem::take(&mut stats.key),
            std::mem::take(&mut stats.name),
            totals,
        );
    }
}

/// Key under which a demographics row joins the aggregates. Region
/// aggregates are keyed by name, so region rows join on their name even
/// when the source carries a numeric code.
fn demographics_key(kind: TerritoryKind, demographics: &Demographics) -> String {
    match kind {
        TerritoryKind::Region => demographics.name.trim().to_lowercase(),
        TerritoryKind::Department | TerritoryKind::Commune => demographics.code.clone(),
    }
}

/// Joins aggregates with demographics on their grouping key.
///
/// Territories that only appear in the demographics (no commune data) are
/// included with zero counts. Demographic names replace the aggregate
/// names, so departments display "Ille-et-Vilaine" rather than "35".
#[must_use]
pub fn build_profiles(
    kind: TerritoryKind,
    stats: Vec<AggregatedStats>,
    demographics: Vec<Demographics>,
) -> Vec<TerritoryProfile> {
    let mut by_key: BTreeMap<String, Demographics> = demographics
        .into_iter()
        .map(|d| (demographics_key(kind, &d), d))
        .collect();

    let mut profiles: BTreeMap<String, TerritoryProfile> = BTreeMap::new();

    for mut s in stats {
        let demographics = by_key.remove(&s.key);
        if let Some(d) = &demographics {
            s.name.clone_from(&d.name);
        }
        profiles.insert(s.key.clone(), TerritoryProfile::new(s, demographics));
    }

    for (key, d) in by_key {
        let stats = AggregatedStats::from_totals(kind, key.clone(), d.name.clone(), Totals::default());
        profiles.insert(key, TerritoryProfile::new(stats, Some(d)));
    }

    profiles.into_values().collect()
}
