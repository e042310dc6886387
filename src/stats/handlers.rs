use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
    routing::{get, post},
};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    client::telegram_client::TelegramUserInfo,
    common::{app_state::AppState, error::ServerError, models::ApiResponse},
    stats::models::SaveResultRequest,
};

const REFRESH_PAUSE: Duration = Duration::from_millis(100);

pub fn stats_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/save-result", post(save_result))
        .route("/get-stats", get(get_stats))
        .route("/leaderboard", get(get_leaderboard))
        .route("/user-games", get(get_user_games))
        .route("/total-stats", get(get_total_stats))
        .route("/get-telegram-user", post(get_telegram_user))
        .route("/fix-usernames", post(fix_usernames))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: Option<i64>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TelegramUserRequest {
    user_id: Option<i64>,
}

fn require_user_id(query: Result<Query<UserQuery>, QueryRejection>) -> Result<(i64, Option<u32>), ServerError> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let user_id = query
        .user_id
        .ok_or_else(|| ServerError::BadRequest("userId is required".into()))?;

    Ok((user_id, query.limit))
}

async fn save_result(
    State(state): State<Arc<AppState>>,
    request: Result<Json<SaveResultRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Json(request) = request.map_err(|e| {
        warn!("Rejected save-result body: {}", e.body_text());
        ServerError::BadRequest("Missing required fields".into())
    })?;
    debug!("Save result request: {:?}", request);

    let record = state.get_stats().save_result(&request).await?;
    let response = ApiResponse::ok(record).with_message("Result saved successfully");

    Ok((StatusCode::OK, Json(response)))
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let (user_id, _) = require_user_id(query)?;
    let stats = state.get_stats().user_stats(user_id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(stats))))
}

async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let entries = state.get_stats().leaderboard(query.limit).await?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(entries))))
}

async fn get_user_games(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let (user_id, limit) = require_user_id(query)?;
    let games = state.get_stats().user_games(user_id, limit).await?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(games))))
}

async fn get_total_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServerError> {
    let totals = state.get_stats().totals().await?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(totals))))
}

async fn get_telegram_user(
    State(state): State<Arc<AppState>>,
    request: Result<Json<TelegramUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let user_id = request
        .ok()
        .and_then(|Json(r)| r.user_id)
        .ok_or_else(|| ServerError::BadRequest("userId is required".into()))?;

    let chat = state
        .get_telegram()
        .get_chat(user_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found or bot has no access".into()))?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(TelegramUserInfo::from(chat)))))
}

async fn fix_usernames(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ServerError> {
    if !state.get_telegram().is_configured() {
        return Err(ServerError::Api(
            StatusCode::SERVICE_UNAVAILABLE,
            "Bot token is not configured".into(),
        ));
    }

    let report = state
        .get_stats()
        .refresh_usernames(state.get_telegram(), REFRESH_PAUSE)
        .await?;
    let message = format!("Updated {} usernames", report.updated);

    Ok((StatusCode::OK, Json(ApiResponse::ok(report).with_message(message))))
}
