use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Pure liveness signal; does not touch the provider.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
