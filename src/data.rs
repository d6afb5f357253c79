use crate::config::InputConfig;
use crate::types::{Region, Table};
use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use shapefile::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Loads a boundary collection, dispatching on the file extension.
pub fn load_regions(path: &Path, input: &InputConfig) -> Result<Vec<Region>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Boundary file has no extension: {:?}", path))?;

    let regions = match extension.as_str() {
        "shp" => load_shapefile_regions(path, input)?,
        "json" | "geojson" => load_geojson_regions(path, input)?,
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    info!(count = regions.len(), file = ?path, "loaded boundary records");

    Ok(regions)
}

fn load_shapefile_regions(path: &Path, input: &InputConfig) -> Result<Vec<Region>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let state_fp = match string_field(&record, &input.state_column)? {
            Some(s) => s,
            None => continue, // Skip if null
        };
        let geoid = match string_field(&record, &input.geoid_column)? {
            Some(s) => s,
            None => continue,
        };

        let geometry = match shape {
            shapefile::Shape::Polygon(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?;
                geo_polygon
            }
            shapefile::Shape::PolygonM(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?;
                geo_polygon
            }
            shapefile::Shape::PolygonZ(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?;
                geo_polygon
            }
            _ => continue, // Skip non-polygon shapes
        };

        regions.push(Region {
            state_fp,
            geoid,
            geometry,
        });
    }

    Ok(regions)
}

fn string_field(record: &shapefile::dbase::Record, column: &str) -> Result<Option<String>> {
    let value = record
        .get(column)
        .ok_or_else(|| anyhow!("Column '{}' not found in Shapefile attributes", column))?;

    match value {
        shapefile::dbase::FieldValue::Character(Some(s)) => Ok(Some(s.clone())),
        shapefile::dbase::FieldValue::Character(None) => Ok(None),
        _ => Err(anyhow!("Shapefile column '{}' must be a string", column)),
    }
}

fn load_geojson_regions(path: &Path, input: &InputConfig) -> Result<Vec<Region>> {
    use geojson::GeoJson;

    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Parse the GeoJSON. warning: this loads the whole file into memory.
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        let state_fp = match property_string(&feature, &input.state_column) {
            Some(s) => s,
            None => continue, // Skip if no id or not string/number
        };
        let geoid = match property_string(&feature, &input.geoid_column) {
            Some(s) => s,
            None => continue,
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let valid_geo: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        regions.push(Region {
            state_fp,
            geoid,
            geometry,
        });
    }

    Ok(regions)
}

fn property_string(feature: &geojson::Feature, column: &str) -> Option<String> {
    match feature.properties.as_ref().and_then(|props| props.get(column)) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Loads a CSV of numeric columns. Unparseable cells read as 0.
pub fn load_table(path: &Path) -> Result<Table> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<f64> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("0").trim().parse().unwrap_or(0.0))
            .collect();
        rows.push(row);
    }

    info!(rows = rows.len(), file = ?path, "loaded table");

    Ok(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use std::io::Write;

    fn test_input() -> InputConfig {
        InputConfig {
            counties: "unused".into(),
            states: "unused".into(),
            state_column: "STATEFP".to_string(),
            geoid_column: "GEOID".to_string(),
        }
    }

    #[test]
    fn loads_regions_from_geojson() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "STATEFP": "02", "GEOID": "02013" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "STATEFP": "15", "GEOID": "15001" },
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [[[[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]]]]
                    }
                }
            ]
        }"#;

        let mut file = tempfile::Builder::new().suffix(".geojson").tempfile().unwrap();
        file.write_all(geojson.as_bytes()).unwrap();

        let regions = load_regions(file.path(), &test_input()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].state_fp, "02");
        assert_eq!(regions[0].geoid, "02013");
        assert_eq!(regions[1].geometry.0.len(), 1);
    }

    #[test]
    fn loads_numeric_table() {
        let csv = "int_rate,fico,loan_status\n3.5,700,0\n4.2,650,1\nbad,720,0\n";
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(csv.as_bytes()).unwrap();

        let table = load_table(file.path()).unwrap();
        assert_eq!(table.headers, vec!["int_rate", "fico", "loan_status"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.column("fico").unwrap(), vec![700.0, 650.0, 720.0]);
        // Unparseable cell falls back to 0
        assert_eq!(table.rows[2][0], 0.0);
    }

    #[test]
    fn missing_column_is_an_error() {
        let table = Table {
            headers: vec!["a".to_string()],
            rows: vec![vec![1.0]],
        };
        assert!(table.column("b").is_err());
    }
}
