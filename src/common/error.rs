use axum::{
    Json,
    response::{IntoResponse, Response},
};
use reqwest::StatusCode;
use tracing::error;

use crate::{
    client::telegram_client::TelegramClientError,
    common::models::ApiResponse,
    stats::error::{StatsError, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Api error: {0} - {1}")]
    Api(StatusCode, String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramClientError),
}

impl From<StatsError> for ServerError {
    fn from(e: StatsError) -> Self {
        match e {
            StatsError::Validation(msg) => ServerError::BadRequest(msg),
            StatsError::Store(e) => ServerError::Store(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServerError::Api(status, msg) => (status, msg),
            ServerError::Internal(msg) => {
                error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Store(e) => {
                error!("Storage failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Telegram(e) => {
                error!("Telegram request failed: {}", e);
                (StatusCode::BAD_GATEWAY, "Telegram request failed".to_string())
            }
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}
