use crate::config::ExportOptions;
use crate::error::Result;
use crate::pipeline::ClusteredTable;
use crate::record::BuildingRecord;
use csv::{ReaderBuilder, WriterBuilder};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct TableRow {
    street: String,
    house_number: String,
    latitude: f64,
    longitude: f64,
    cluster: Option<i32>,
}

impl From<&BuildingRecord> for TableRow {
    fn from(record: &BuildingRecord) -> Self {
        Self {
            street: record.street().to_string(),
            house_number: record.house_number().to_string(),
            latitude: record.latitude(),
            longitude: record.longitude(),
            cluster: record.cluster(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CoordinateRow {
    latitude: f64,
    longitude: f64,
}

/// Writes `street, house_number, latitude, longitude, cluster`, replacing
/// whatever the file held before.
pub fn write_table<P: AsRef<Path>>(path: P, table: &ClusteredTable, options: &ExportOptions) -> Result<()> {
    let file = File::create(&path)?;
    write_rows(file, table.records.iter().map(TableRow::from), options)?;
    info!("Wrote {} buildings to {:?}", table.len(), path.as_ref());
    Ok(())
}

/// Reads a table written by [`write_table`] with the same options.
pub fn read_table<P: AsRef<Path>>(path: P, options: &ExportOptions) -> Result<Vec<BuildingRecord>> {
    read_rows(File::open(path)?, options)
}

/// Writes only `latitude, longitude` of each record.
pub fn write_coordinates<P: AsRef<Path>>(
    path: P,
    records: &[BuildingRecord],
    options: &ExportOptions,
) -> Result<()> {
    let file = File::create(&path)?;
    let rows = records.iter().map(|r| CoordinateRow {
        latitude: r.latitude(),
        longitude: r.longitude(),
    });
    write_rows(file, rows, options)?;
    info!("Wrote {} coordinates to {:?}", records.len(), path.as_ref());
    Ok(())
}

fn write_rows<W, T, I>(writer: W, rows: I, options: &ExportOptions) -> Result<()>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut wtr = WriterBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_header)
        .from_writer(writer);

    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_rows<R: Read>(reader: R, options: &ExportOptions) -> Result<Vec<BuildingRecord>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_header)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let row: TableRow = result?;
        let mut record = BuildingRecord::new(row.street, row.house_number, row.latitude, row.longitude)?;
        if let Some(label) = row.cluster {
            record.set_cluster(label);
        }
        records.push(record);
    }
    Ok(records)
}
