//! Read-only territory store abstraction.
//!
//! [`TerritoryStore`] is the only way the analytics engine reaches the
//! source data. [`SqlStore`] reads the `SQLite` tables; [`MemoryStore`]
//! serves an in-memory [`Dataset`], loaded from a JSON file or built
//! directly (tests, demos).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ev_map_database_models::{CommuneRow, CommuneScope, DemographicsRow, RegionVehicleRow};
use ev_map_territory_models::{
    CommuneRecord, Demographics, RegionVehicleCount, TerritoryKind, codes,
};
use serde::{Deserialize, Serialize};
use switchy_database::Database;

use crate::{StoreError, queries};

/// Read primitives over the four source datasets.
#[async_trait]
pub trait TerritoryStore: Send + Sync {
    /// Returns the communes within `scope`.
    async fn communes(&self, scope: &CommuneScope) -> Result<Vec<CommuneRecord>, StoreError>;

    /// Looks up a single commune by name and postal code.
    async fn commune(
        &self,
        name: &str,
        postal_code: &str,
    ) -> Result<Option<CommuneRecord>, StoreError>;

    /// Returns the demographics rows for departments or regions.
    async fn demographics(&self, kind: TerritoryKind) -> Result<Vec<Demographics>, StoreError>;

    /// Returns the per-region vehicle counts.
    async fn region_vehicle_counts(&self) -> Result<Vec<RegionVehicleCount>, StoreError>;

    /// Searches communes by name or postal code.
    async fn search_communes(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CommuneRecord>, StoreError>;
}

/// Returns `true` if `commune` falls within `scope`.
///
/// Scopes are applied after validation, so communes whose department or
/// region was derived from their postal code are matched too.
#[must_use]
pub fn in_scope(scope: &CommuneScope, commune: &CommuneRecord) -> bool {
    match scope {
        CommuneScope::All => true,
        CommuneScope::Department(code) => {
            commune.department_code == codes::normalize_department_code(code)
        }
        CommuneScope::Region(name) => commune
            .region
            .as_deref()
            .is_some_and(|region| codes::same_name(region, name)),
    }
}

/// Store backed by the `SQLite` source tables.
pub struct SqlStore {
    db: Arc<dyn Database>,
}

impl SqlStore {
    /// Wraps an open database connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TerritoryStore for SqlStore {
    async fn communes(&self, scope: &CommuneScope) -> Result<Vec<CommuneRecord>, StoreError> {
        let communes = queries::get_communes(self.db.as_ref()).await?;
        Ok(communes.into_iter().filter(|c| in_scope(scope, c)).collect())
    }

    async fn commune(
        &self,
        name: &str,
        postal_code: &str,
    ) -> Result<Option<CommuneRecord>, StoreError> {
        let candidates =
            queries::get_communes_by_postal_code(self.db.as_ref(), postal_code.trim()).await?;
        Ok(candidates
            .into_iter()
            .find(|c| codes::same_name(&c.name, name)))
    }

    async fn demographics(&self, kind: TerritoryKind) -> Result<Vec<Demographics>, StoreError> {
        queries::get_demographics(self.db.as_ref(), kind).await
    }

    async fn region_vehicle_counts(&self) -> Result<Vec<RegionVehicleCount>, StoreError> {
        queries::get_region_vehicle_counts(self.db.as_ref()).await
    }

    async fn search_communes(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CommuneRecord>, StoreError> {
        queries::search_communes(self.db.as_ref(), query, limit).await
    }
}

/// Raw dataset file layout, mirroring the source tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    /// Commune rows (vehicle counts joined with station counts).
    pub communes: Vec<CommuneRow>,
    /// Department demographics rows.
    pub departments: Vec<DemographicsRow>,
    /// Region demographics rows.
    pub regions: Vec<DemographicsRow>,
    /// Per-region vehicle rows.
    pub region_vehicles: Vec<RegionVehicleRow>,
}

/// Store serving validated records from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    communes: Vec<CommuneRecord>,
    departments: Vec<Demographics>,
    regions: Vec<Demographics>,
    region_vehicles: Vec<RegionVehicleCount>,
}

impl MemoryStore {
    /// Creates a store holding the given communes and nothing else.
    #[must_use]
    pub fn new(communes: Vec<CommuneRecord>) -> Self {
        Self {
            communes,
            ..Self::default()
        }
    }

    /// Adds demographics rows. Each row goes to the department or region
    /// list according to its kind.
    #[must_use]
    pub fn with_demographics(mut self, demographics: Vec<Demographics>) -> Self {
        for d in demographics {
            match d.kind {
                TerritoryKind::Region => self.regions.push(d),
                TerritoryKind::Department | TerritoryKind::Commune => self.departments.push(d),
            }
        }
        self
    }

    /// Adds per-region vehicle counts.
    #[must_use]
    pub fn with_region_vehicles(mut self, counts: Vec<RegionVehicleCount>) -> Self {
        self.region_vehicles.extend(counts);
        self
    }

    /// Validates a raw dataset into a store, skipping invalid rows.
    #[must_use]
    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut skipped = 0usize;
        let mut skip = |e: ev_map_database_models::SchemaError| {
            log::warn!("Skipping row: {e}");
            skipped += 1;
        };

        let mut store = Self::default();
        for row in dataset.communes {
            match row.validate() {
                Ok(c) => store.communes.push(c),
                Err(e) => skip(e),
            }
        }
        for row in dataset.departments {
            match row.validate(TerritoryKind::Department) {
                Ok(d) => store.departments.push(d),
                Err(e) => skip(e),
            }
        }
        for row in dataset.regions {
            match row.validate(TerritoryKind::Region) {
                Ok(d) => store.regions.push(d),
                Err(e) => skip(e),
            }
        }
        for row in dataset.region_vehicles {
            match row.validate() {
                Ok(r) => store.region_vehicles.push(r),
                Err(e) => skip(e),
            }
        }

        log::info!(
            "Loaded dataset: {} communes, {} departments, {} regions ({skipped} rows skipped)",
            store.communes.len(),
            store.departments.len(),
            store.regions.len(),
        );
        store
    }

    /// Loads a JSON [`Dataset`] file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        let dataset: Dataset = serde_json::from_str(&contents)?;
        Ok(Self::from_dataset(dataset))
    }
}

#[async_trait]
impl TerritoryStore for MemoryStore {
    async fn communes(&self, scope: &CommuneScope) -> Result<Vec<CommuneRecord>, StoreError> {
        Ok(self
            .communes
            .iter()
            .filter(|c| in_scope(scope, c))
            .cloned()
            .collect())
    }

    async fn commune(
        &self,
        name: &str,
        postal_code: &str,
    ) -> Result<Option<CommuneRecord>, StoreError> {
        let postal_code = postal_code.trim();
        Ok(self
            .communes
            .iter()
            .find(|c| c.postal_code == postal_code && codes::same_name(&c.name, name))
            .cloned())
    }

    async fn demographics(&self, kind: TerritoryKind) -> Result<Vec<Demographics>, StoreError> {
        Ok(match kind {
            TerritoryKind::Region => self.regions.clone(),
            TerritoryKind::Department => self.departments.clone(),
            TerritoryKind::Commune => Vec::new(),
        })
    }

    async fn region_vehicle_counts(&self) -> Result<Vec<RegionVehicleCount>, StoreError> {
        Ok(self.region_vehicles.clone())
    }

    async fn search_communes(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CommuneRecord>, StoreError> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<(u8, &CommuneRecord)> = self
            .communes
            .iter()
            .filter_map(|c| {
                let name = c.name.to_lowercase();
                let rank = if name == query || c.postal_code == query {
                    0
                } else if name.starts_with(&query) || c.postal_code.starts_with(&query) {
                    1
                } else if name.contains(&query) {
                    2
                } else {
                    return None;
                };
                Some((rank, c))
            })
            .collect();

        matches.sort_by(|(ra, a), (rb, b)| {
            ra.cmp(rb)
                .then_with(|| b.electric_vehicles.cmp(&a.electric_vehicles))
        });

        Ok(matches
            .into_iter()
            .take(limit)
            .map(|(_, c)| c.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commune(name: &str, postal: &str, dept: &str, region: Option<&str>, ev: u64) -> CommuneRecord {
        CommuneRecord {
            name: name.to_string(),
            postal_code: postal.to_string(),
            department_code: dept.to_string(),
            region: region.map(str::to_string),
            electric_vehicles: ev,
            total_vehicles: ev * 10,
            stations: 1,
            charging_points: 2,
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            commune("Rennes", "35000", "35", Some("Bretagne"), 500),
            commune("Rennes-le-Château", "11190", "11", Some("Occitanie"), 2),
            commune("Brest", "29200", "29", Some("Bretagne"), 300),
            commune("Saint-Brieuc", "22000", "22", None, 80),
        ])
    }

    #[tokio::test]
    async fn scopes_filter_communes() {
        let store = store();
        let bretagne = store
            .communes(&CommuneScope::Region("bretagne".to_string()))
            .await
            .unwrap();
        assert_eq!(bretagne.len(), 2);

        let finistere = store
            .communes(&CommuneScope::Department("29".to_string()))
            .await
            .unwrap();
        assert_eq!(finistere.len(), 1);
        assert_eq!(finistere[0].name, "Brest");

        let all = store.communes(&CommuneScope::All).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn commune_lookup_needs_matching_postal_code() {
        let store = store();
        assert!(store.commune("rennes", "35000").await.unwrap().is_some());
        assert!(store.commune("Rennes", "11190").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_ranks_exact_then_prefix() {
        let store = store();
        let results = store.search_communes("Rennes", 10).await.unwrap();
        let names: Vec<&str> = results.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Rennes", "Rennes-le-Château"]);

        let by_postal = store.search_communes("29", 10).await.unwrap();
        assert_eq!(by_postal.len(), 1);
        assert_eq!(by_postal[0].name, "Brest");

        assert!(store.search_communes("  ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sql_store_reads_the_source_tables() {
        let path = std::env::temp_dir().join("ev_map_sql_store.db");
        let _ = std::fs::remove_file(&path);
        let db = crate::db::open(&path).await.unwrap();
        db.exec_raw(
            "INSERT INTO vehicules_communes (commune, code_postal, code_departement, region, nb_vp_rechargeables_el, nb_vp)
             VALUES ('Rennes', '35000', '35', 'Bretagne', 600, 10000),
                    ('Brest', '29200', NULL, NULL, 400, 8000),
                    ('Ajaccio', '20000', '2a', 'Corse', 100, 3000)",
        )
        .await
        .unwrap();
        db.exec_raw(
            "INSERT INTO bornes (id_station, commune, code_postal, code_departement, region, nbre_pdc)
             VALUES ('b1', 'brest', '29200', '29', 'Bretagne', 3)",
        )
        .await
        .unwrap();

        let store = SqlStore::new(Arc::from(db));

        let bretagne = store
            .communes(&CommuneScope::Region("BRETAGNE".to_string()))
            .await
            .unwrap();
        assert_eq!(bretagne.len(), 2);

        let corse = store
            .communes(&CommuneScope::Department("2A".to_string()))
            .await
            .unwrap();
        assert_eq!(corse.len(), 1);
        assert_eq!(corse[0].department_code, "2A");

        let brest = store.commune("BREST", " 29200 ").await.unwrap().unwrap();
        assert_eq!(brest.department_code, "29");
        assert_eq!(brest.stations, 1);
        assert_eq!(brest.charging_points, 3);
        assert!(store.commune("Brest", "35000").await.unwrap().is_none());

        assert!(store.demographics(TerritoryKind::Region).await.unwrap().is_empty());
    }

    #[test]
    fn dataset_rows_are_validated() {
        let dataset: Dataset = serde_json::from_str(
            r#"{
                "communes": [
                    {"commune": "Rennes", "postal_code": "35000", "electric_vehicles": 10},
                    {"commune": "Nowhere", "postal_code": null}
                ],
                "regions": [{"name": "Bretagne", "population": 3400000, "area_km2": 27208.0}]
            }"#,
        )
        .unwrap();
        let store = MemoryStore::from_dataset(dataset);
        assert_eq!(store.communes.len(), 1);
        assert_eq!(store.communes[0].department_code, "35");
        assert_eq!(store.regions.len(), 1);
    }
}
