//! Read queries over the source tables.
//!
//! Each function decodes rows into the loose `ev_map_database_models` row
//! types and validates them. Rows with unusable identity columns are
//! skipped with a warning; they never abort the whole query.

use ev_map_database_models::{CommuneRow, DemographicsRow, RegionVehicleRow, SchemaError};
use ev_map_territory_models::{CommuneRecord, Demographics, RegionVehicleCount, TerritoryKind};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::StoreError;

/// Joins per-commune vehicle counts with per-commune station counts.
///
/// Stations are matched to communes on postal code and case-folded commune
/// name. Communes that have stations but no vehicle row are still returned
/// (with missing vehicle counts).
const COMMUNES_SQL: &str = "
    WITH stations AS (
        SELECT code_postal,
               LOWER(TRIM(commune)) AS commune_key,
               MAX(commune) AS commune,
               MAX(code_departement) AS code_departement,
               MAX(region) AS region,
               COUNT(*) AS bornes,
               SUM(COALESCE(nbre_pdc, 1)) AS points
        FROM bornes
        GROUP BY code_postal, LOWER(TRIM(commune))
    ),
    communes AS (
        SELECT v.commune,
               v.code_postal,
               COALESCE(v.code_departement, s.code_departement) AS code_departement,
               COALESCE(v.region, s.region) AS region,
               v.nb_vp_rechargeables_el AS electric_vehicles,
               v.nb_vp AS total_vehicles,
               s.bornes AS stations,
               s.points AS charging_points
        FROM vehicules_communes v
        LEFT JOIN stations s
          ON s.code_postal = v.code_postal
         AND s.commune_key = LOWER(TRIM(v.commune))
        UNION ALL
        SELECT s.commune, s.code_postal, s.code_departement, s.region,
               NULL, NULL, s.bornes, s.points
        FROM stations s
        WHERE NOT EXISTS (
            SELECT 1 FROM vehicules_communes v
            WHERE v.code_postal = s.code_postal
              AND LOWER(TRIM(v.commune)) = s.commune_key
        )
    )
    SELECT commune, code_postal, code_departement, region,
           electric_vehicles, total_vehicles, stations, charging_points
    FROM communes";

fn commune_row(row: &Row) -> CommuneRow {
    CommuneRow {
        commune: row.to_value("commune").unwrap_or(None),
        postal_code: row.to_value("code_postal").unwrap_or(None),
        department_code: row.to_value("code_departement").unwrap_or(None),
        region: row.to_value("region").unwrap_or(None),
        electric_vehicles: row.to_value("electric_vehicles").unwrap_or(None),
        total_vehicles: row.to_value("total_vehicles").unwrap_or(None),
        stations: row.to_value("stations").unwrap_or(None),
        charging_points: row.to_value("charging_points").unwrap_or(None),
    }
}

/// Keeps the records that validated, logging the ones that didn't.
fn keep_valid<T>(results: impl IntoIterator<Item = Result<T, SchemaError>>) -> Vec<T> {
    let mut skipped = 0usize;
    let records: Vec<T> = results
        .into_iter()
        .filter_map(|result| match result {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping row: {e}");
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        log::warn!("Skipped {skipped} invalid row(s), kept {}", records.len());
    }

    records
}

/// Returns every commune with its vehicle and charging counts.
///
/// # Errors
///
/// Returns [`StoreError`] if the database query fails.
pub async fn get_communes(db: &dyn Database) -> Result<Vec<CommuneRecord>, StoreError> {
    let rows = db.query_raw_params(COMMUNES_SQL, &[]).await?;
    log::debug!("Fetched {} commune rows", rows.len());
    Ok(keep_valid(rows.iter().map(|r| commune_row(r).validate())))
}

/// Returns the communes with the given postal code.
///
/// # Errors
///
/// Returns [`StoreError`] if the database query fails.
pub async fn get_communes_by_postal_code(
    db: &dyn Database,
    postal_code: &str,
) -> Result<Vec<CommuneRecord>, StoreError> {
    let sql = format!("{COMMUNES_SQL} WHERE code_postal = $1");
    let rows = db
        .query_raw_params(&sql, &[DatabaseValue::String(postal_code.to_string())])
        .await?;
    Ok(keep_valid(rows.iter().map(|r| commune_row(r).validate())))
}

/// Searches communes by name or postal code.
///
/// Results are ordered by match quality: exact name or postal code first,
/// then prefix matches, then substring matches, with ties broken by
/// electric vehicle count.
///
/// # Errors
///
/// Returns [`StoreError`] if the database query fails.
pub async fn search_communes(
    db: &dyn Database,
    query: &str,
    limit: usize,
) -> Result<Vec<CommuneRecord>, StoreError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    // Each placeholder appears once, in order.
    let sql = format!(
        "SELECT * FROM ({COMMUNES_SQL}) c
         WHERE c.commune LIKE $1 OR c.code_postal LIKE $2
         ORDER BY CASE
                      WHEN c.commune LIKE $3 OR c.code_postal = $4 THEN 0
                      WHEN c.commune LIKE $5 OR c.code_postal LIKE $6 THEN 1
                      ELSE 2
                  END,
                  COALESCE(c.electric_vehicles, 0) DESC
         LIMIT $7"
    );

    let contains = DatabaseValue::String(format!("%{query}%"));
    let prefix = DatabaseValue::String(format!("{query}%"));
    let exact = DatabaseValue::String(query.to_string());

    let rows = db
        .query_raw_params(
            &sql,
            &[
                contains,
                prefix.clone(),
                exact.clone(),
                exact,
                prefix.clone(),
                prefix,
                DatabaseValue::Int64(i64::try_from(limit).unwrap_or(i64::MAX)),
            ],
        )
        .await?;

    Ok(keep_valid(rows.iter().map(|r| commune_row(r).validate())))
}

/// Returns the demographics of every department or every region.
///
/// # Errors
///
/// Returns [`StoreError`] if the database query fails.
pub async fn get_demographics(
    db: &dyn Database,
    kind: TerritoryKind,
) -> Result<Vec<Demographics>, StoreError> {
    let sql = match kind {
        TerritoryKind::Region => {
            "SELECT code, nom, NULL AS region, population, superficie_km2, densite
             FROM regions"
        }
        TerritoryKind::Department => {
            "SELECT code, nom, region, population, superficie_km2, densite
             FROM departements"
        }
        TerritoryKind::Commune => return Ok(Vec::new()),
    };

    let rows = db.query_raw_params(sql, &[]).await?;

    Ok(keep_valid(rows.iter().map(|row| {
        DemographicsRow {
            code: row.to_value("code").unwrap_or(None),
            name: row.to_value("nom").unwrap_or(None),
            region: row.to_value("region").unwrap_or(None),
            population: row.to_value("population").unwrap_or(None),
            area_km2: row.to_value("superficie_km2").unwrap_or(None),
            density: row.to_value("densite").unwrap_or(None),
        }
        .validate(kind)
    })))
}

/// Returns the per-region vehicle counts.
///
/// # Errors
///
/// Returns [`StoreError`] if the database query fails.
pub async fn get_region_vehicle_counts(
    db: &dyn Database,
) -> Result<Vec<RegionVehicleCount>, StoreError> {
    let rows = db
        .query_raw_params(
            "SELECT region, nb_vp_rechargeables_el, nb_vp FROM vehicules_regions",
            &[],
        )
        .await?;

    Ok(keep_valid(rows.iter().map(|row| {
        RegionVehicleRow {
            region: row.to_value("region").unwrap_or(None),
            electric_vehicles: row.to_value("nb_vp_rechargeables_el").unwrap_or(None),
            total_vehicles: row.to_value("nb_vp").unwrap_or(None),
        }
        .validate()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn seeded(name: &str) -> Box<dyn Database> {
        let path = std::env::temp_dir().join(format!("ev_map_queries_{name}.db"));
        let _ = std::fs::remove_file(&path);
        let db = db::open(&path).await.unwrap();

        db.exec_raw(
            "INSERT INTO bornes (id_station, nom_station, commune, code_postal, code_departement, region, nbre_pdc)
             VALUES ('b1', 'Gare', 'Rennes', '35000', '35', 'Bretagne', 4),
                    ('b2', 'Mairie', 'RENNES ', '35000', '35', 'Bretagne', NULL),
                    ('b3', 'Port', 'Quimper', '29000', '29', 'Bretagne', 2)",
        )
        .await
        .unwrap();
        db.exec_raw(
            "INSERT INTO vehicules_communes (commune, code_postal, code_departement, region, nb_vp_rechargeables_el, nb_vp)
             VALUES ('Rennes', '35000', '35', 'Bretagne', 600, 10000),
                    ('Brest', '29200', '29', 'Bretagne', 400, 8000),
                    ('Rennes-le-Château', '11190', '11', 'Occitanie', 2, 100)",
        )
        .await
        .unwrap();
        db.exec_raw(
            "INSERT INTO regions (code, nom, population, superficie_km2, densite)
             VALUES ('53', 'Bretagne', 3400000, 27208.0, 125.0)",
        )
        .await
        .unwrap();
        db.exec_raw(
            "INSERT INTO departements (code, nom, region, population, superficie_km2, densite)
             VALUES ('35', 'Ille-et-Vilaine', NULL, 1100000, 6775.0, NULL)",
        )
        .await
        .unwrap();
        db.exec_raw(
            "INSERT INTO vehicules_regions (region, nb_vp_rechargeables_el, nb_vp)
             VALUES ('Bretagne', 1000, 500)",
        )
        .await
        .unwrap();

        db
    }

    fn find<'a>(communes: &'a [CommuneRecord], name: &str) -> &'a CommuneRecord {
        communes.iter().find(|c| c.name == name).unwrap()
    }

    #[tokio::test]
    async fn stations_join_communes_ignoring_name_case() {
        let db = seeded("join").await;
        let communes = get_communes(db.as_ref()).await.unwrap();
        assert_eq!(communes.len(), 4);

        let rennes = find(&communes, "Rennes");
        assert_eq!(rennes.electric_vehicles, 600);
        assert_eq!(rennes.stations, 2);
        // A missing point count counts as one point.
        assert_eq!(rennes.charging_points, 5);

        let brest = find(&communes, "Brest");
        assert_eq!(brest.stations, 0);
        assert_eq!(brest.charging_points, 0);
    }

    #[tokio::test]
    async fn station_only_communes_are_returned() {
        let db = seeded("station_only").await;
        let communes = get_communes(db.as_ref()).await.unwrap();
        let quimper = find(&communes, "Quimper");
        assert_eq!(quimper.postal_code, "29000");
        assert_eq!(quimper.department_code, "29");
        assert_eq!(quimper.region.as_deref(), Some("Bretagne"));
        assert_eq!(quimper.electric_vehicles, 0);
        assert_eq!(quimper.total_vehicles, 0);
        assert_eq!(quimper.stations, 1);
        assert_eq!(quimper.charging_points, 2);
    }

    #[tokio::test]
    async fn communes_by_postal_code() {
        let db = seeded("postal").await;
        let communes = get_communes_by_postal_code(db.as_ref(), "35000").await.unwrap();
        assert_eq!(communes.len(), 1);
        assert_eq!(communes[0].name, "Rennes");
        assert!(get_communes_by_postal_code(db.as_ref(), "75001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_orders_by_match_quality() {
        let db = seeded("search").await;

        let names = |communes: Vec<CommuneRecord>| -> Vec<String> {
            communes.into_iter().map(|c| c.name).collect()
        };

        let results = search_communes(db.as_ref(), "Rennes", 10).await.unwrap();
        assert_eq!(names(results), vec!["Rennes", "Rennes-le-Château"]);

        let results = search_communes(db.as_ref(), "29", 10).await.unwrap();
        assert_eq!(names(results), vec!["Brest", "Quimper"]);

        let results = search_communes(db.as_ref(), "r", 1).await.unwrap();
        assert_eq!(names(results), vec!["Rennes"]);

        assert!(search_communes(db.as_ref(), "   ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn demographics_keep_region_codes_and_names() {
        let db = seeded("demographics").await;

        let regions = get_demographics(db.as_ref(), TerritoryKind::Region).await.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].code, "53");
        assert_eq!(regions[0].name, "Bretagne");
        assert_eq!(regions[0].population, 3_400_000);
        assert!((regions[0].area_km2 - 27_208.0).abs() < f64::EPSILON);

        let departments = get_demographics(db.as_ref(), TerritoryKind::Department)
            .await
            .unwrap();
        assert_eq!(departments.len(), 1);
        assert_eq!(departments[0].region.as_deref(), Some("Bretagne"));
        assert_eq!(departments[0].reported_density, None);

        assert!(get_demographics(db.as_ref(), TerritoryKind::Commune).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn region_vehicle_totals_cover_electric_counts() {
        let db = seeded("region_vehicles").await;
        let counts = get_region_vehicle_counts(db.as_ref()).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].electric_vehicles, 1000);
        assert_eq!(counts[0].total_vehicles, 1000);
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let db = seeded("schema").await;
        crate::ensure_schema(db.as_ref()).await.unwrap();
        assert_eq!(get_communes(db.as_ref()).await.unwrap().len(), 4);
    }
}
