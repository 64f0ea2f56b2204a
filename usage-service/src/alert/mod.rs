use elec_core::MeterReading;
use time::format_description::well_known::Rfc3339;

/// Alert text the notification channel should deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageAlert {
    pub device_id: String,
    pub kwh: f64,
    pub timestamp_rfc3339: String,
    pub threshold_kwh: f64,
}

impl UsageAlert {
    pub fn subject(&self) -> String {
        "HIGH USAGE ALERT - Electricity Tracker".to_string()
    }

    pub fn body(&self) -> String {
        format!(
            "Device {} reported {} kWh at {}, exceeding the {} kWh threshold.",
            self.device_id, self.kwh, self.timestamp_rfc3339, self.threshold_kwh
        )
    }

    pub fn reason(&self) -> String {
        format!(
            "Usage {} kWh exceeds threshold {} kWh",
            self.kwh, self.threshold_kwh
        )
    }
}

/// Decides whether an upload warrants an alert: at most one per
/// upload, for the first reading strictly above the threshold.
pub struct HighUsagePolicy {
    threshold_kwh: f64,
}

impl HighUsagePolicy {
    pub fn new(threshold_kwh: f64) -> Self {
        Self { threshold_kwh }
    }

    pub fn first_breach(&self, readings: &[MeterReading]) -> Option<UsageAlert> {
        readings
            .iter()
            .find(|r| r.kwh > self.threshold_kwh)
            .map(|r| UsageAlert {
                device_id: r.device_id.clone(),
                kwh: r.kwh,
                timestamp_rfc3339: r
                    .timestamp
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| r.timestamp.to_string()),
                threshold_kwh: self.threshold_kwh,
            })
    }
}

/// Delivery side of alerting; the policy above decides, a channel
/// delivers.
#[async_trait::async_trait]
pub trait AlertChannel: Send + Sync {
    async fn send(&self, alert: &UsageAlert) -> anyhow::Result<()>;
}

/// Channel that writes alerts to the service log.
pub struct LogAlertChannel;

#[async_trait::async_trait]
impl AlertChannel for LogAlertChannel {
    async fn send(&self, alert: &UsageAlert) -> anyhow::Result<()> {
        tracing::warn!(
            device_id = %alert.device_id,
            kwh = alert.kwh,
            threshold_kwh = alert.threshold_kwh,
            subject = %alert.subject(),
            "{}",
            alert.body()
        );
        metrics::counter!("usage_alerts_sent_total").increment(1);
        Ok(())
    }
}
