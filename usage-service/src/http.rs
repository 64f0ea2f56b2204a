use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use elec_core::{BillingEstimator, CoreError, EnergyAnalyzer, MeterReading, SpikeEvent};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertChannel, HighUsagePolicy};
use crate::archive::CsvArchive;
use crate::config::BillingConfig;
use crate::store::ReadingStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReadingStore>,
    pub archive: Arc<CsvArchive>,
    pub alerts: Arc<dyn AlertChannel>,
    pub policy: Arc<HighUsagePolicy>,
    pub billing: BillingConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/usage", get(usage))
        .route("/readings", get(readings))
        .route("/anomalies", get(anomalies))
        .route("/estimate", get(estimate))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        // Both validation and (tariff) configuration errors come from
        // caller-supplied input at this layer.
        Self::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            Self::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Month,
}

#[derive(Serialize)]
struct UploadResponse {
    upload_id: String,
    processed_count: usize,
    alert_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    alert_reason: Option<String>,
}

async fn upload(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    metrics::counter!("upload_requests_total").increment(1);

    let readings = elec_core::parse_csv_str(&body).map_err(|e| {
        metrics::counter!("upload_rejected_total").increment(1);
        ApiError::from(e)
    })?;

    let upload_id = state.archive.store(&body)?;
    let processed_count = state.store.append(&readings).await?;
    tracing::info!(upload_id = %upload_id, processed_count, "upload processed");

    let mut response = UploadResponse {
        upload_id,
        processed_count,
        alert_sent: false,
        alert_reason: None,
    };

    if let Some(alert) = state.policy.first_breach(&readings) {
        match state.alerts.send(&alert).await {
            Ok(()) => {
                response.alert_sent = true;
                response.alert_reason = Some(alert.reason());
            }
            Err(e) => tracing::warn!(error = %e, "failed to deliver usage alert"),
        }
    }

    Ok((StatusCode::ACCEPTED, Json(response)))
}

#[derive(Deserialize)]
struct UsageParams {
    device_id: String,
    #[serde(default)]
    period: Period,
}

#[derive(Serialize)]
struct UsagePoint {
    period: String,
    total_kwh: f64,
}

#[derive(Serialize)]
struct UsageResponse {
    device_id: String,
    period: Period,
    data: Vec<UsagePoint>,
}

async fn usage(
    State(state): State<AppState>,
    Query(params): Query<UsageParams>,
) -> Result<Json<UsageResponse>, ApiError> {
    let totals = usage_for(&state, &params.device_id, params.period).await?;
    Ok(Json(UsageResponse {
        device_id: params.device_id,
        period: params.period,
        data: to_points(totals),
    }))
}

#[derive(Deserialize)]
struct ReadingsParams {
    device_id: String,
}

#[derive(Serialize)]
struct ReadingsResponse {
    device_id: String,
    readings: Vec<MeterReading>,
}

async fn readings(
    State(state): State<AppState>,
    Query(params): Query<ReadingsParams>,
) -> Result<Json<ReadingsResponse>, ApiError> {
    let readings = state.store.for_device(&params.device_id).await?;
    Ok(Json(ReadingsResponse {
        device_id: params.device_id,
        readings,
    }))
}

#[derive(Deserialize)]
struct AnomaliesParams {
    device_id: String,
    threshold_pct: Option<f64>,
}

#[derive(Serialize)]
struct AnomaliesResponse {
    device_id: String,
    threshold_pct: f64,
    spikes: Vec<SpikeEvent>,
}

async fn anomalies(
    State(state): State<AppState>,
    Query(params): Query<AnomaliesParams>,
) -> Result<Json<AnomaliesResponse>, ApiError> {
    let threshold_pct = params.threshold_pct.unwrap_or(50.0);
    let stored = state.store.for_device(&params.device_id).await?;
    let analyzer = EnergyAnalyzer::new(stored);
    Ok(Json(AnomaliesResponse {
        device_id: params.device_id,
        threshold_pct,
        spikes: analyzer.detect_spikes(threshold_pct),
    }))
}

#[derive(Deserialize)]
struct EstimateParams {
    device_id: String,
    rate: Option<f64>,
    #[serde(default)]
    period: Period,
}

#[derive(Serialize)]
struct EstimateResponse {
    device_id: String,
    period: Period,
    estimated_cost: f64,
    rate_per_kwh: f64,
    currency: String,
}

async fn estimate(
    State(state): State<AppState>,
    Query(params): Query<EstimateParams>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let rate_per_kwh = params.rate.unwrap_or(state.billing.default_rate_per_kwh);
    let estimator = BillingEstimator::new(rate_per_kwh)?;

    let totals = usage_for(&state, &params.device_id, params.period).await?;
    let estimated_cost = estimator.estimate_cost(&totals)?;

    Ok(Json(EstimateResponse {
        device_id: params.device_id,
        period: params.period,
        estimated_cost,
        rate_per_kwh,
        currency: state.billing.currency.clone(),
    }))
}

async fn usage_for(
    state: &AppState,
    device_id: &str,
    period: Period,
) -> Result<BTreeMap<String, f64>, ApiError> {
    let stored = state.store.for_device(device_id).await?;
    let analyzer = EnergyAnalyzer::new(stored);
    Ok(match period {
        Period::Day => analyzer.daily_usage(),
        Period::Month => analyzer.monthly_usage(),
    })
}

fn to_points(totals: BTreeMap<String, f64>) -> Vec<UsagePoint> {
    totals
        .into_iter()
        .map(|(period, total_kwh)| UsagePoint { period, total_kwh })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_defaults_to_day() {
        let params: UsageParams = serde_json::from_str(r#"{"device_id": "d1"}"#).unwrap();
        assert_eq!(params.period, Period::Day);
    }

    #[test]
    fn period_parses_lowercase_names() {
        let params: UsageParams =
            serde_json::from_str(r#"{"device_id": "d1", "period": "month"}"#).unwrap();
        assert_eq!(params.period, Period::Month);
    }

    #[test]
    fn usage_points_stay_sorted_by_period() {
        let mut totals = BTreeMap::new();
        totals.insert("2025-11-02".to_string(), 7.0);
        totals.insert("2025-11-01".to_string(), 2.5);
        let points = to_points(totals);
        assert_eq!(points[0].period, "2025-11-01");
        assert_eq!(points[1].period, "2025-11-02");
    }

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        AppState {
            store: Arc::new(crate::store::JsonlStore::new(dir.path().join("readings.jsonl"))),
            archive: Arc::new(CsvArchive::new(dir.path().join("uploads"))),
            alerts: Arc::new(crate::alert::LogAlertChannel),
            policy: Arc::new(HighUsagePolicy::new(10.0)),
            billing: BillingConfig::default(),
        }
    }

    const TWO_DAY_CSV: &str = "\
device_id,timestamp,kwh
d1,2025-11-01T00:00:00Z,1.0
d1,2025-11-01T01:00:00Z,1.5
d1,2025-11-02T00:00:00Z,5.0
d1,2025-11-02T01:00:00Z,2.0
";

    #[tokio::test]
    async fn upload_then_query_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (status, Json(uploaded)) = upload(State(state.clone()), TWO_DAY_CSV.to_string())
            .await
            .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(uploaded.processed_count, 4);
        assert!(!uploaded.alert_sent);

        let Json(usage_resp) = usage(
            State(state.clone()),
            Query(UsageParams {
                device_id: "d1".to_string(),
                period: Period::Day,
            }),
        )
        .await
        .unwrap();
        assert_eq!(usage_resp.data.len(), 2);
        assert_eq!(usage_resp.data[0].period, "2025-11-01");
        assert_eq!(usage_resp.data[0].total_kwh, 2.5);
        assert_eq!(usage_resp.data[1].total_kwh, 7.0);

        let Json(anoms) = anomalies(
            State(state.clone()),
            Query(AnomaliesParams {
                device_id: "d1".to_string(),
                threshold_pct: Some(50.0),
            }),
        )
        .await
        .unwrap();
        assert_eq!(anoms.spikes.len(), 1);
        assert_eq!(anoms.spikes[0].date, "2025-11-02");
        assert_eq!(anoms.spikes[0].prev_kwh, 2.5);
        assert_eq!(anoms.spikes[0].curr_kwh, 7.0);

        let Json(est) = estimate(
            State(state),
            Query(EstimateParams {
                device_id: "d1".to_string(),
                rate: Some(0.25),
                period: Period::Day,
            }),
        )
        .await
        .unwrap();
        assert_eq!(est.estimated_cost, 2.38);
        assert_eq!(est.currency, "EUR");
    }

    #[tokio::test]
    async fn upload_rejects_invalid_csv_without_storing() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let bad = "device_id,timestamp,kwh\nd1,2025-11-01T00:00:00Z,-1\n";
        let res = upload(State(state.clone()), bad.to_string()).await;
        assert!(matches!(res, Err(ApiError::BadRequest(_))));

        let Json(resp) = readings(
            State(state),
            Query(ReadingsParams {
                device_id: "d1".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(resp.readings.is_empty());
    }

    #[tokio::test]
    async fn upload_flags_high_usage() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let csv = "device_id,timestamp,kwh\nd1,2025-11-01T00:00:00Z,12.5\n";
        let (_, Json(resp)) = upload(State(state), csv.to_string()).await.unwrap();
        assert!(resp.alert_sent);
        assert!(resp.alert_reason.unwrap().contains("12.5"));
    }
}
