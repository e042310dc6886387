use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::{identity::models::display_name, stats::service::UsernameLookup};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, thiserror::Error)]
pub enum TelegramClientError {
    #[error("Http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Api error: {0} - {1}")]
    ApiError(StatusCode, String),

    #[error("Bot token is not configured")]
    MissingToken,
}

#[derive(Debug, Clone, Deserialize)]
struct BotApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramUserInfo {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub telegram_username: Option<String>,
}

impl From<TelegramChat> for TelegramUserInfo {
    fn from(chat: TelegramChat) -> Self {
        Self {
            username: display_name(
                chat.id,
                chat.username.as_deref(),
                chat.first_name.as_deref(),
            ),
            first_name: chat.first_name,
            last_name: chat.last_name,
            telegram_username: chat.username,
        }
    }
}

/// Thin Bot API client for the lookups the HTTP API needs. The bot itself
/// talks to Telegram through teloxide.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    token: String,
}

impl TelegramClient {
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    /// `None` when the chat does not exist or the bot cannot see it.
    pub async fn get_chat(&self, user_id: i64) -> Result<Option<TelegramChat>, TelegramClientError> {
        if !self.is_configured() {
            return Err(TelegramClientError::MissingToken);
        }

        debug!("Looking up Telegram chat {}", user_id);
        let url = format!("{}/bot{}/getChat", TELEGRAM_API, self.token);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": user_id }))
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or("No body".into());
            error!("Telegram getChat failed: {} - {}", status, body);
            return Err(TelegramClientError::ApiError(status, body));
        }

        let body = response.json::<BotApiResponse<TelegramChat>>().await?;
        if !body.ok {
            warn!(
                "Telegram has no chat {}: {}",
                user_id,
                body.description.unwrap_or_default()
            );
            return Ok(None);
        }

        Ok(body.result)
    }
}

#[async_trait]
impl UsernameLookup for TelegramClient {
    async fn lookup_username(&self, user_id: i64) -> Option<String> {
        match self.get_chat(user_id).await {
            Ok(chat) => chat.map(|c| TelegramUserInfo::from(c).username),
            Err(e) => {
                error!("Failed to look up username of {}: {}", user_id, e);
                None
            }
        }
    }
}
