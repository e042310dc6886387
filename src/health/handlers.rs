use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use reqwest::StatusCode;
use serde_json::json;

use tracing::error;

use crate::common::{app_state::AppState, error::ServerError};

pub fn health_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/detailed", get(health_detailed))
        .with_state(state.clone())
}

async fn health() -> impl IntoResponse {
    "OK".into_response()
}

async fn health_detailed(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServerError> {
    let platform = true;
    let stats = state.get_stats();

    let storage_status = match stats.health_check().await {
        Ok(_) => true,
        Err(e) => {
            error!("Failed storage health check: {}", e);
            false
        }
    };

    let json = json!({
        "platform": platform,
        "storage": storage_status,
        "backend": stats.backend(),
    });

    Ok((StatusCode::OK, Json(json)))
}
