pub mod jsonl;

pub use jsonl::JsonlStore;

use elec_core::MeterReading;

/// Durable reading store as seen by the service: append validated
/// readings, fetch everything recorded for one device.
#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    /// Appends readings, returning how many were written.
    async fn append(&self, readings: &[MeterReading]) -> anyhow::Result<usize>;

    /// Fetches all stored readings for `device_id`, oldest first.
    async fn for_device(&self, device_id: &str) -> anyhow::Result<Vec<MeterReading>>;
}
