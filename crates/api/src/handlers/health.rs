use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let status = if state.dispatcher.is_running() {
        "ok"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "sandworm",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
