//! CSV exports for the admin dashboard.
//!
//! Each export overwrites its target file, writes a header row and is
//! fsynced before returning.

use crate::lifecycle::sort_for_review;
use crate::{BloodRequest, InventoryEntry, Result};
use std::fs::File;
use std::path::Path;

#[derive(Debug, serde::Serialize)]
struct InventoryRow {
    blood_type: String,
    quantity_ml: i64,
    last_updated: String,
}

impl From<&InventoryEntry> for InventoryRow {
    fn from(entry: &InventoryEntry) -> Self {
        InventoryRow {
            blood_type: entry.blood_type.to_string(),
            quantity_ml: entry.quantity_ml,
            last_updated: entry.last_updated.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct RequestRow {
    id: String,
    recipient_id: String,
    blood_type: String,
    quantity_ml: i64,
    hospital_name: String,
    contact_number: String,
    emergency: bool,
    status: String,
    created_at: String,
}

impl From<&BloodRequest> for RequestRow {
    fn from(request: &BloodRequest) -> Self {
        RequestRow {
            id: request.id.to_string(),
            recipient_id: request.recipient_id.to_string(),
            blood_type: request.blood_type.to_string(),
            quantity_ml: request.quantity_ml,
            hospital_name: request.hospital_name.clone(),
            contact_number: request.contact_number.clone(),
            emergency: request.emergency,
            status: request.status.to_string(),
            created_at: request.created_at.to_rfc3339(),
        }
    }
}

fn write_rows<T, I>(path: &Path, rows: I) -> Result<usize>
where
    T: serde::Serialize,
    I: IntoIterator<Item = T>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(file);

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} rows to {:?}", count, path);
    Ok(count)
}

/// Write inventory levels, one row per blood type
pub fn export_inventory_csv(entries: &[InventoryEntry], path: &Path) -> Result<usize> {
    write_rows(path, entries.iter().map(InventoryRow::from))
}

/// Write requests in review order (emergencies first, then newest)
pub fn export_requests_csv(requests: &[BloodRequest], path: &Path) -> Result<usize> {
    let mut ordered = requests.to_vec();
    sort_for_review(&mut ordered);
    write_rows(path, ordered.iter().map(RequestRow::from))
}
