use super::RawRow;
use crate::error::{Error, Result};
use csv::{ReaderBuilder, Trim};
use log::{info, warn};
use serde_json::Value;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

const JSON_COLLECTION_KEYS: &[&str] = &["data", "features", "records"];

/// Reads a delimited file with a header row into raw rows.
pub fn load_csv<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Vec<RawRow>> {
    let file = File::open(&path)?;
    let rows = read_csv(file, delimiter)?;
    info!("Loaded {} rows from {:?}", rows.len(), path.as_ref());
    Ok(rows)
}

pub fn read_csv<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut rows: Vec<RawRow> = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        match result {
            Ok(record) => rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .filter(|(_, value)| !value.is_empty())
                    .collect(),
            ),
            Err(e) => warn!("Skipping unreadable CSV row {}: {}", i + 1, e),
        }
    }

    Ok(rows)
}

/// Reads JSON records: a bare array, an object holding the array under
/// `data`, `features` or `records`, or a GeoJSON feature collection.
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let text = fs::read_to_string(&path)?;
    let rows = parse_json(&text)?;
    info!("Loaded {} rows from {:?}", rows.len(), path.as_ref());
    Ok(rows)
}

pub fn parse_json(text: &str) -> Result<Vec<RawRow>> {
    let items = match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => items,
        Value::Object(mut map) => JSON_COLLECTION_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                Error::parameter("JSON input holds no array under `data`, `features` or `records`")
            })?,
        _ => return Err(Error::parameter("JSON input must be an array or an object")),
    };

    Ok(items.into_iter().map(row_from_value).collect())
}

fn row_from_value(value: Value) -> RawRow {
    let mut row = RawRow::new();
    let Value::Object(map) = value else {
        return row;
    };

    match map.get("properties") {
        Some(Value::Object(properties)) => {
            for (key, value) in properties {
                insert_value(&mut row, key, value);
            }
            if let Some((lon, lat)) = map.get("geometry").and_then(geojson_point) {
                row.insert("centroid", format!("POINT({} {})", lon, lat));
            }
        }
        _ => {
            for (key, value) in &map {
                insert_value(&mut row, key, value);
            }
        }
    }

    row
}

fn insert_value(row: &mut RawRow, key: &str, value: &Value) {
    match value {
        Value::String(s) => row.insert(key, s.as_str()),
        Value::Number(n) => row.insert(key, n.to_string()),
        Value::Bool(b) => row.insert(key, b.to_string()),
        Value::Object(_) => {
            if let Some((lon, lat)) = geojson_point(value) {
                row.insert(key, format!("POINT({} {})", lon, lat));
            }
        }
        Value::Null | Value::Array(_) => {}
    }
}

fn geojson_point(value: &Value) -> Option<(f64, f64)> {
    if value.get("type")?.as_str()? != "Point" {
        return None;
    }
    let coords = value.get("coordinates")?.as_array()?;
    Some((coords.first()?.as_f64()?, coords.get(1)?.as_f64()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::normalize;
    use std::io::Write;

    #[test]
    fn test_read_csv_semicolon() {
        let data = "Улица;Номер дома;Широта;Долгота\nЛенина;1;55,75;37,61\nЛенина;2;;\n";
        let rows = read_csv(data.as_bytes(), b';').unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Широта"), Some("55,75"));
        assert_eq!(rows[1].get("Широта"), None);

        let records = normalize(rows).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "street,house_number,centroid").unwrap();
        writeln!(file, "Mira,10,POINT(37.6 55.7)").unwrap();

        let rows = load_csv(file.path(), b',').unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("centroid"), Some("POINT(37.6 55.7)"));
    }

    #[test]
    fn test_parse_json_array_of_objects() {
        let text = r#"[
            {"street": "Mira", "house_number": 12, "latitude": 55.7, "longitude": 37.6},
            {"street": "Mira", "house_number": null, "latitude": 55.7, "longitude": 37.6}
        ]"#;

        let rows = parse_json(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("house_number"), Some("12"));
        assert_eq!(rows[1].get("house_number"), None);
    }

    #[test]
    fn test_parse_json_api_envelope() {
        let text = r#"{"data": [{"street": "Mira", "house_number": "1", "centroid": "POINT(37.6 55.7)"}]}"#;
        let rows = parse_json(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("centroid"), Some("POINT(37.6 55.7)"));
    }

    #[test]
    fn test_parse_geojson_features() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"street": "Mira", "house_number": "3"},
                "geometry": {"type": "Point", "coordinates": [37.6, 55.7]}
            }]
        }"#;

        let records = normalize(parse_json(text).unwrap()).unwrap();
        assert_eq!(records[0].longitude(), 37.6);
        assert_eq!(records[0].latitude(), 55.7);
    }

    #[test]
    fn test_parse_json_rejects_scalars() {
        assert!(matches!(parse_json("42"), Err(Error::InvalidParameter(_))));
        assert!(matches!(parse_json(r#"{"rows": []}"#), Err(Error::InvalidParameter(_))));
        assert!(matches!(parse_json("{"), Err(Error::Json(_))));
    }
}
