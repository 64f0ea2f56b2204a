use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::MeterReading;

/// A day whose total rose more than the requested percentage over the
/// previous day. Totals are rounded to 4 decimal places at emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeEvent {
    pub date: String,
    pub prev_kwh: f64,
    pub curr_kwh: f64,
}

/// Aggregates one device's readings into daily/monthly kWh totals and
/// flags day-over-day spikes.
///
/// The caller scopes the readings to a single device; the analyzer
/// itself does not filter. Readings are stable-sorted by
/// `(device_id, timestamp)` once at construction.
pub struct EnergyAnalyzer {
    readings: Vec<MeterReading>,
}

impl EnergyAnalyzer {
    pub fn new(mut readings: Vec<MeterReading>) -> Self {
        readings.sort_by(|a, b| {
            (a.device_id.as_str(), a.timestamp).cmp(&(b.device_id.as_str(), b.timestamp))
        });
        Self { readings }
    }

    /// Total kWh per calendar day, keyed `YYYY-MM-DD`.
    ///
    /// The day is taken from each timestamp's own offset; no timezone
    /// normalization is applied. Days with no readings are absent.
    pub fn daily_usage(&self) -> BTreeMap<String, f64> {
        let mut daily: BTreeMap<String, f64> = BTreeMap::new();
        for r in &self.readings {
            *daily.entry(day_key(r)).or_insert(0.0) += r.kwh;
        }
        daily
    }

    /// Total kWh per calendar month, keyed `YYYY-MM`.
    ///
    /// Derived from the daily totals by key prefix, not recomputed
    /// from the raw readings.
    pub fn monthly_usage(&self) -> BTreeMap<String, f64> {
        let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
        for (day, kwh) in self.daily_usage() {
            *monthly.entry(day[..7].to_string()).or_insert(0.0) += kwh;
        }
        monthly
    }

    /// Flags each day whose total grew strictly more than
    /// `threshold_pct` percent over the previous day.
    ///
    /// A pair whose previous day totals zero is skipped outright: a
    /// first nonzero day after a zero day is never flagged, whatever
    /// its magnitude.
    pub fn detect_spikes(&self, threshold_pct: f64) -> Vec<SpikeEvent> {
        let daily = self.daily_usage();
        let entries: Vec<(&String, &f64)> = daily.iter().collect();

        let mut spikes = Vec::new();
        for pair in entries.windows(2) {
            let (_, &prev) = pair[0];
            let (curr_date, &curr) = pair[1];
            if prev == 0.0 {
                continue;
            }
            let change_pct = (curr - prev) / prev * 100.0;
            if change_pct > threshold_pct {
                spikes.push(SpikeEvent {
                    date: curr_date.clone(),
                    prev_kwh: round4(prev),
                    curr_kwh: round4(curr),
                });
            }
        }
        spikes
    }
}

fn day_key(r: &MeterReading) -> String {
    let date = r.timestamp.date();
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
