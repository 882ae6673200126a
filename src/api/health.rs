//! Health check endpoints

use axum::{Json, extract::State as AxumState};
use chrono::Utc;
use serde_json::{Value, json};

use crate::SharedState;

/// GET /health - status, app name, port and the current time
pub async fn health(AxumState(state): AxumState<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "app": state.config.app_name,
        "port": state.config.port,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// POST /health - status and app name only
pub async fn health_post(AxumState(state): AxumState<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "app": state.config.app_name,
    }))
}
