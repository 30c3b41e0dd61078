//! Tabular export of facility records.
//!
//! Column order is fixed: `id, kind, latitude, longitude, name`, then the
//! source's attribute keys, then `region, sub_region`.

use crate::error::Result;
use crate::model::FacilityRecord;
use std::io::Write;
use std::path::Path;

/// Header row for the given attribute keys.
pub fn header(attribute_keys: &[&str]) -> Vec<String> {
    let mut cols: Vec<String> = ["id", "kind", "latitude", "longitude", "name"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    cols.extend(attribute_keys.iter().map(|k| k.to_string()));
    cols.push("region".to_string());
    cols.push("sub_region".to_string());
    cols
}

fn row(record: &FacilityRecord, attribute_keys: &[&str]) -> Vec<String> {
    let mut cols = vec![
        record.id.to_string(),
        record.kind.as_str().to_string(),
        record.latitude.to_string(),
        record.longitude.to_string(),
        record.name.clone(),
    ];
    cols.extend(attribute_keys.iter().map(|k| record.attribute(k).to_string()));
    cols.push(record.group_key.region.clone());
    cols.push(record.group_key.sub_region.clone());
    cols
}

/// Write `records` as CSV to any writer.
pub fn write_to<W: Write>(writer: W, records: &[FacilityRecord], attribute_keys: &[&str]) -> Result<()> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(header(attribute_keys))?;
    for record in records {
        csv.write_record(row(record, attribute_keys))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `records` as CSV to `path`, creating parent directories.
pub fn write_records(path: &Path, records: &[FacilityRecord], attribute_keys: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_to(file, records, attribute_keys)
}
