//! CSV export of the event log.

use crate::{Result, SmokingEvent};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: Option<u64>,
    user_id: i64,
    timestamp: String,
    planned_time: String,
    was_early: bool,
    interval_before: u32,
}

impl From<&SmokingEvent> for CsvRow {
    fn from(event: &SmokingEvent) -> Self {
        CsvRow {
            id: event.id.map(|id| id.0),
            user_id: event.user_id.0,
            timestamp: event.timestamp.to_rfc3339(),
            planned_time: event.planned_time.to_rfc3339(),
            was_early: event.was_early,
            interval_before: event.interval_before,
        }
    }
}

/// Append events to a CSV file, writing headers if the file is new or empty.
///
/// The file is fsynced before returning. Returns the number of rows written.
pub fn export_events_csv(events: &[SmokingEvent], csv_path: &Path) -> Result<usize> {
    if events.is_empty() {
        tracing::info!("No events to export");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Appending to existing content must not repeat the header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for event in events {
        writer.serialize(CsvRow::from(event))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} events to {:?}", events.len(), csv_path);
    Ok(events.len())
}
