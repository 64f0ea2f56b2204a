use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the Prometheus recorder and serves `/metrics` on
/// `bind_addr` in a background task. Call at most once.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    let addr: SocketAddr = bind_addr.parse()?;
    tokio::spawn(serve(addr));
    Ok(())
}

async fn serve(addr: SocketAddr) {
    let app = Router::new().route("/metrics", get(render_metrics));

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                tracing::error!(error = %e, "metrics server error");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to bind metrics listener");
        }
    }
}

async fn render_metrics() -> String {
    match PROM_HANDLE.get() {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}
