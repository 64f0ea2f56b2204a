use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::CoreError;

/// One interval reading for a device: the kWh delivered in the
/// interval ending at `timestamp`. Interval values are summed by the
/// analyzer, never diffed against each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    pub device_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub kwh: f64,
}

impl MeterReading {
    /// Builds a validated reading. `device_id` must be non-empty and
    /// `kwh` must be a finite, non-negative number.
    pub fn new(device_id: impl Into<String>, timestamp: OffsetDateTime, kwh: f64) -> Result<Self, CoreError> {
        let device_id = device_id.into();
        if device_id.is_empty() {
            return Err(CoreError::Validation("device_id must be non-empty".to_string()));
        }
        if !kwh.is_finite() {
            return Err(CoreError::Validation(format!("kwh must be a finite number, got '{kwh}'")));
        }
        if kwh < 0.0 {
            return Err(CoreError::Validation(format!("kwh must be non-negative, got '{kwh}'")));
        }
        Ok(Self {
            device_id,
            timestamp,
            kwh,
        })
    }
}
