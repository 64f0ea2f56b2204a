use std::sync::Arc;

use anyhow::Result;
use usage_service::{
    alert::{HighUsagePolicy, LogAlertChannel},
    archive::CsvArchive,
    config::AppConfig,
    metrics_server, observability,
    store::JsonlStore,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let state = AppState {
        store: Arc::new(JsonlStore::new(&cfg.storage.readings_path)),
        archive: Arc::new(CsvArchive::new(&cfg.storage.archive_dir)),
        alerts: Arc::new(LogAlertChannel),
        policy: Arc::new(HighUsagePolicy::new(cfg.alerts.high_usage_threshold_kwh)),
        billing: cfg.billing.clone(),
    };

    let app = usage_service::router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.http.bind_addr).await?;
    tracing::info!(bind_addr = %cfg.http.bind_addr, "usage service listening");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
