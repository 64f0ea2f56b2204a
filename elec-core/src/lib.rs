pub mod analysis;
pub mod billing;
pub mod domain;
pub mod error;
pub mod ingest;

pub use analysis::{EnergyAnalyzer, SpikeEvent};
pub use billing::BillingEstimator;
pub use domain::MeterReading;
pub use error::CoreError;
pub use ingest::parse_csv_str;
