use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use elec_core::MeterReading;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::store::ReadingStore;

/// File-backed store: one JSON object per line, RFC 3339 timestamps.
///
/// Reads deduplicate by `(device_id, timestamp)`, keeping the last
/// write. Appends and reads are serialized through a single lock; file
/// I/O is blocking but short-lived, as in the CSV backfill path.
pub struct JsonlStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait::async_trait]
impl ReadingStore for JsonlStore {
    async fn append(&self, readings: &[MeterReading]) -> anyhow::Result<usize> {
        if readings.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        for reading in readings {
            let line = serde_json::to_string(reading)?;
            writeln!(file, "{line}")?;
        }

        metrics::counter!("readings_appended_total").increment(readings.len() as u64);
        Ok(readings.len())
    }

    async fn for_device(&self, device_id: &str) -> anyhow::Result<Vec<MeterReading>> {
        let _guard = self.lock.lock().await;

        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        // Keep the last write per timestamp; BTreeMap yields oldest first.
        let mut seen: BTreeMap<OffsetDateTime, MeterReading> = BTreeMap::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let reading: MeterReading = serde_json::from_str(line)?;
            if reading.device_id != device_id {
                continue;
            }
            seen.insert(reading.timestamp, reading);
        }

        Ok(seen.into_values().collect())
    }
}
