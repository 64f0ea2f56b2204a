use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_readings_path")]
    pub readings_path: String,
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "default_rate_per_kwh")]
    pub default_rate_per_kwh: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_high_usage_threshold_kwh")]
    pub high_usage_threshold_kwh: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Loads TOML config from the path in `USAGE_CONFIG` (default
    /// `usage-config.toml`). A missing file yields the defaults; a
    /// present but malformed file is an error.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("USAGE_CONFIG").unwrap_or_else(|_| "usage-config.toml".to_string());
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let cfg: AppConfig = toml::from_str(&contents)?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind_addr: default_http_bind_addr() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            readings_path: default_readings_path(),
            archive_dir: default_archive_dir(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_rate_per_kwh: default_rate_per_kwh(),
            currency: default_currency(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { high_usage_threshold_kwh: default_high_usage_threshold_kwh() }
    }
}

fn default_http_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_readings_path() -> String {
    "data/readings.jsonl".to_string()
}

fn default_archive_dir() -> String {
    "data/uploads".to_string()
}

fn default_rate_per_kwh() -> f64 {
    0.20
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_high_usage_threshold_kwh() -> f64 {
    10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_in_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [http]
            bind_addr = "0.0.0.0:9999"

            [billing]
            default_rate_per_kwh = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(cfg.http.bind_addr, "0.0.0.0:9999");
        assert_eq!(cfg.billing.default_rate_per_kwh, 0.25);
        assert_eq!(cfg.billing.currency, "EUR");
        assert_eq!(cfg.storage.readings_path, "data/readings.jsonl");
        assert_eq!(cfg.alerts.high_usage_threshold_kwh, 10.0);
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.http.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.billing.default_rate_per_kwh, 0.20);
    }

    #[test]
    fn metrics_section_is_optional_but_strict() {
        let cfg: AppConfig = toml::from_str("[metrics]\nbind_addr = \"127.0.0.1:9100\"\n").unwrap();
        assert_eq!(cfg.metrics.unwrap().bind_addr, "127.0.0.1:9100");
    }
}
