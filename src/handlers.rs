use axum::{extract::State, response::IntoResponse, Json};

use crate::health::HealthChecker;
use crate::registry::ClientRegistry;

/// Demo downstream handler sitting behind the throttle
pub async fn hello() -> &'static str {
    "Hello, world!"
}

/// Health check endpoint
pub async fn health_check(State(registry): State<ClientRegistry>) -> impl IntoResponse {
    Json(HealthChecker::new(registry).check_health())
}
