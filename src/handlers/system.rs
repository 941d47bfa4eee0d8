// handlers/system.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(root)).route("/health", get(health))
}

/// GET / - service description
async fn root() -> Json<Value> {
    Json(json!({
        "name": "Agora API",
        "version": env!("CARGO_PKG_VERSION"),
        "products": {
            "auth": "/auth/:role/{join,login,refresh,me,password,mfa}",
            "admin": "/admin/accounts",
            "discussionBoard": "/discussionBoard",
            "community": "/community",
            "shoppingMall": "/shoppingMall",
            "todoList": "/todoList",
        }
    }))
}

/// GET /health - database ping
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "timestamp": now, "database": "ok" })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "timestamp": now, "database": "unavailable" })),
            )
        }
    }
}
