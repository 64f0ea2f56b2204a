use std::collections::BTreeMap;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CoreError;

/// Estimates a billed cost from aggregated usage under a flat tariff.
///
/// The total is accumulated as a decimal and rounded half-up (midpoint
/// away from zero) to 2 places, so exact .005 boundaries round up:
/// 2.375 becomes 2.38, never 2.37.
pub struct BillingEstimator {
    rate: Decimal,
}

impl BillingEstimator {
    /// `rate_per_kwh` is the flat tariff in currency units per kWh. A
    /// negative or non-finite rate is a configuration error, never
    /// clamped.
    pub fn new(rate_per_kwh: f64) -> Result<Self, CoreError> {
        if !rate_per_kwh.is_finite() || rate_per_kwh < 0.0 {
            return Err(CoreError::Configuration(format!(
                "tariff rate must be a non-negative number, got '{rate_per_kwh}'"
            )));
        }
        let rate = Decimal::from_f64(rate_per_kwh).ok_or_else(|| {
            CoreError::Configuration(format!("tariff rate '{rate_per_kwh}' is not representable"))
        })?;
        Ok(Self { rate })
    }

    /// Sums the bucket totals (any period granularity), applies the
    /// tariff and rounds to 2 decimal places half-up.
    pub fn estimate_cost(&self, usage_by_period: &BTreeMap<String, f64>) -> Result<f64, CoreError> {
        let mut total_kwh = Decimal::ZERO;
        for &kwh in usage_by_period.values() {
            total_kwh += Decimal::from_f64(kwh).ok_or_else(|| {
                CoreError::Validation(format!("usage total '{kwh}' is not representable"))
            })?;
        }

        let cost = (total_kwh * self.rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        cost.to_f64().ok_or_else(|| {
            CoreError::Validation(format!("estimated cost '{cost}' is not representable"))
        })
    }
}
