//! Health and version endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::json_response;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub mode: String,
    pub node_id: String,
    /// Which store backend is live
    pub store: &'static str,
    pub notifier_enabled: bool,
    pub timestamp: String,
}

/// Liveness probe (/health, /healthz): 200 whenever the service is running
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: state.args.node_id.to_string(),
        store: if state.store.is_memory() { "memory" } else { "mongodb" },
        notifier_enabled: state.args.notifier_enabled,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    json_response(StatusCode::OK, &response)
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Build information for deployment verification
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "wicket",
    };
    json_response(StatusCode::OK, &response)
}
