//! Building records and the normalizer that produces them.
//!
//! Input rows carry no fixed schema. The normalizer looks columns up by a
//! list of accepted names (the English ones and the Russian headers of the
//! municipal address sheets), reads the position from latitude/longitude
//! columns or from a `POINT(lon lat)` centroid, and drops every row it
//! cannot make sense of.
//!
//! # Examples
//!
//! ```rust
//! use geocluster::record::{normalize, RawRow};
//!
//! let rows = vec![
//!     RawRow::from_iter([("Улица", "Lenina"), ("Номер дома", "12"), ("Широта", "55.75"), ("Долгота", "37.61")]),
//!     RawRow::from_iter([("street", "Lenina"), ("house_number", "14"), ("centroid", "POINT(37.62 55.76)")]),
//!     RawRow::from_iter([("street", "Lenina")]), // skipped, no house number
//! ];
//!
//! let records = normalize(rows).unwrap();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1].longitude(), 37.62);
//! ```

mod loader;

pub use loader::{load_csv, load_json, parse_json, read_csv};

use crate::error::{Error, Result};
use crate::geometry::Point;
use log::{info, warn};
use std::collections::{BTreeMap, HashSet};

const STREET_KEYS: &[&str] = &["street", "street_name", "улица"];
const HOUSE_KEYS: &[&str] = &["house_number", "housenumber", "house", "номер дома"];
const LATITUDE_KEYS: &[&str] = &["latitude", "lat", "широта"];
const LONGITUDE_KEYS: &[&str] = &["longitude", "lon", "lng", "долгота"];
const CENTROID_KEYS: &[&str] = &["centroid", "geometry", "point", "wkt"];

#[derive(Clone, Debug, PartialEq)]
pub struct BuildingRecord {
    street: String,
    house_number: String,
    latitude: f64,
    longitude: f64,
    cluster: Option<i32>,
}

impl BuildingRecord {
    pub fn new(
        street: impl Into<String>,
        house_number: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self> {
        check_position(latitude, longitude).map_err(Error::parameter)?;

        Ok(Self {
            street: street.into(),
            house_number: house_number.into(),
            latitude,
            longitude,
            cluster: None,
        })
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn house_number(&self) -> &str {
        &self.house_number
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn cluster(&self) -> Option<i32> {
        self.cluster
    }

    /// Planar position with `x = longitude`, `y = latitude`.
    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    pub(crate) fn set_cluster(&mut self, label: i32) {
        self.cluster = Some(label);
    }
}

/// One loosely shaped input row: column name to raw text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
    fields: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First non-blank value whose column name matches one of `aliases`,
    /// ignoring case, surrounding whitespace and a leading byte-order mark.
    fn lookup(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.fields.iter().find_map(|(key, value)| {
                let key = key.trim_start_matches('\u{feff}').trim().to_lowercase();
                let value = value.trim();
                (key == *alias && !value.is_empty()).then_some(value)
            })
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

/// Turns raw rows into building records, skipping the ones that cannot be
/// read. Fails only when nothing survives.
pub fn normalize<I>(rows: I) -> Result<Vec<BuildingRecord>>
where
    I: IntoIterator<Item = RawRow>,
{
    let mut records = Vec::new();
    let mut skipped = 0;

    for (i, row) in rows.into_iter().enumerate() {
        match normalize_row(i + 1, &row) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping row: {}", e);
                skipped += 1;
            }
        }
    }

    if records.is_empty() {
        return Err(Error::empty(format!(
            "no valid building records in input ({} rows skipped)",
            skipped
        )));
    }

    info!("Normalized {} building records ({} rows skipped)", records.len(), skipped);
    Ok(records)
}

fn normalize_row(row_no: usize, row: &RawRow) -> Result<BuildingRecord> {
    let street = row
        .lookup(STREET_KEYS)
        .ok_or_else(|| Error::malformed(row_no, "missing street"))?;
    let house_number = row
        .lookup(HOUSE_KEYS)
        .ok_or_else(|| Error::malformed(row_no, "missing house number"))?;

    let latitude = row.lookup(LATITUDE_KEYS).and_then(parse_coordinate);
    let longitude = row.lookup(LONGITUDE_KEYS).and_then(parse_coordinate);

    // A usable column pair wins; otherwise the centroid is tried.
    let columns = match (longitude, latitude) {
        (Some(lon), Some(lat)) => Some(check_position(lat, lon).map(|()| (lon, lat))),
        _ => None,
    };

    let (longitude, latitude) = match (columns, row.lookup(CENTROID_KEYS)) {
        (Some(Ok(position)), _) => position,
        (_, Some(text)) => {
            let (lon, lat) = parse_point(text).ok_or_else(|| {
                Error::malformed(row_no, format!("unparseable centroid {:?}", text))
            })?;
            check_position(lat, lon).map_err(|reason| Error::malformed(row_no, reason))?;
            (lon, lat)
        }
        (Some(Err(reason)), None) => return Err(Error::malformed(row_no, reason)),
        (None, None) => return Err(Error::malformed(row_no, "missing coordinates")),
    };

    Ok(BuildingRecord {
        street: street.to_string(),
        house_number: house_number.to_string(),
        latitude,
        longitude,
        cluster: None,
    })
}

fn check_position(latitude: f64, longitude: f64) -> std::result::Result<(), String> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("latitude {} out of range", latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("longitude {} out of range", longitude));
    }
    Ok(())
}

/// Parses a decimal coordinate, accepting a comma as decimal separator.
fn parse_coordinate(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses a WKT `POINT(lon lat)` into `(lon, lat)`.
pub fn parse_point(text: &str) -> Option<(f64, f64)> {
    let text = text.trim();
    let keyword = text.get(..5)?;
    if !keyword.eq_ignore_ascii_case("point") {
        return None;
    }

    let inner = text[5..]
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?;

    let mut parts = inner.split_whitespace();
    let lon = parts.next()?.parse::<f64>().ok()?;
    let lat = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
}

/// Unique street names in first-seen order.
pub fn street_names(records: &[BuildingRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.street.as_str()))
        .map(|r| r.street.clone())
        .collect()
}

/// Records on the selected streets. An empty selection keeps everything.
pub fn filter_streets(records: &[BuildingRecord], selected: &[String]) -> Vec<BuildingRecord> {
    if selected.is_empty() {
        return records.to_vec();
    }

    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
    records
        .iter()
        .filter(|r| selected.contains(r.street.as_str()))
        .cloned()
        .collect()
}

/// House numbers on the given streets, in input order.
pub fn buildings_on<'a>(records: &'a [BuildingRecord], streets: &[String]) -> Vec<&'a str> {
    records
        .iter()
        .filter(|r| streets.iter().any(|s| s == &r.street))
        .map(|r| r.house_number.as_str())
        .collect()
}
