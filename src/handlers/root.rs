use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::context::AppContext;

/// GET / - service banner and endpoint map
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "DevCamper API",
            "version": version,
            "description": "Bootcamp directory API built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/v1/auth/* (register, login, password reset; others protected)",
                "bootcamps": "/api/v1/bootcamps (read public, write publisher/admin)",
                "courses": "/api/v1/courses, /api/v1/bootcamps/:bootcampId/courses",
                "reviews": "/api/v1/reviews, /api/v1/bootcamps/:bootcampId/reviews",
                "users": "/api/v1/users (admin)"
            }
        }
    }))
}

/// GET /health - 503 when the store is unreachable
pub async fn health(State(ctx): State<AppContext>) -> (StatusCode, Json<Value>) {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match ctx.stores.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "healthy",
                    "database": "connected",
                    "timestamp": timestamp
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Database unavailable",
                    "data": {
                        "status": "unhealthy",
                        "database": "disconnected",
                        "timestamp": timestamp
                    }
                })),
            )
        }
    }
}
