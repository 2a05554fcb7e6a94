use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub api_url: String,
    pub webhook_secret_configured: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.config.smobilpay.environment.to_string(),
        api_url: state.gateway.api_url().to_string(),
        webhook_secret_configured: state.config.smobilpay.webhook_secret.is_some(),
    })
}
