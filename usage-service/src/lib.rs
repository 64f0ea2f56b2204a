pub mod alert;
pub mod archive;
pub mod config;
pub mod http;
pub mod metrics_server;
pub mod observability;
pub mod store;

pub use http::{router, AppState};
