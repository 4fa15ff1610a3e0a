pub mod auth;
pub mod games;
pub mod generate;
pub mod payments;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "lotostats-backend",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "generation_configured": state.gemini.is_configured(),
        "payments_configured": state.payments.is_configured(),
        "endpoints": {
            "games": "/api/games",
            "generate": "/api/generate",
            "auth": "/api/auth",
            "payments": "/api/create_preference",
            "health": "/api/health"
        }
    }))
}
