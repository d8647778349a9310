use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version, and whether retrieval has an index to serve from.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let retrieval = if state.index_chunks > 0 {
        "ready"
    } else {
        "unavailable"
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "autocare-api",
        "retrieval": retrieval,
        "index_chunks": state.index_chunks
    }))
}
