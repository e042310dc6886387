use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::CONTENT_RANGE};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, error, info};

use crate::stats::{
    error::StoreError,
    models::{GameRecord, NewGame, TotalStats, UserRecord},
    store::StatsStore,
};

const APPLY_ATTEMPTS: u32 = 5;

const USER_COLUMNS: &str = "user_id,username,total_games,total_score,best_score,correct_answers,wrong_answers,created_at,updated_at";

/// Stats stored in a hosted Supabase project through its PostgREST API.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_key = api_key.into();

        if base_url.is_empty() || api_key.is_empty() {
            return Err(StoreError::Config(
                "storage.supabase_url and storage.supabase_key must be set".into(),
            ));
        }

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn checked(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or("No body".into());
        error!("Supabase request failed: {} - {}", status, body);
        Err(StoreError::Api(status, body))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let request = self.client.get(self.table(table)).query(query);
        let response = self.authorized(request).send().await?;
        let rows = Self::checked(response).await?.json::<Vec<T>>().await?;

        Ok(rows)
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .authorized(request)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows = Self::checked(response).await?.json::<Vec<T>>().await?;

        Ok(rows)
    }

    async fn count(&self, table: &str) -> Result<i64, StoreError> {
        let request = self
            .client
            .get(self.table(table))
            .query(&[("select", "*"), ("limit", "1")])
            .header("Prefer", "count=exact");
        let response = Self::checked(self.authorized(request).send().await?).await?;

        // "0-0/42", or "*/0" for an empty table
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                StoreError::Api(
                    StatusCode::BAD_GATEWAY,
                    format!("Missing row count for table {}", table),
                )
            })?;

        Ok(total)
    }

    fn single<T>(rows: Vec<T>, what: &str) -> Result<T, StoreError> {
        rows.into_iter().next().ok_or_else(|| {
            StoreError::Api(
                StatusCode::BAD_GATEWAY,
                format!("Supabase returned no row for {}", what),
            )
        })
    }
}

#[async_trait]
impl StatsStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.count("users").await?;
        info!("Supabase stats store is reachable at {}", self.base_url);
        Ok(())
    }

    async fn register_user(&self, user_id: i64, username: &str) -> Result<UserRecord, StoreError> {
        debug!("Registering user {} as {}", user_id, username);
        let now = Utc::now();

        if let Some(mut existing) = self.find_user(user_id).await? {
            let request = self
                .client
                .patch(self.table("users"))
                .query(&[("user_id", format!("eq.{}", user_id))]);
            let body = json!({ "username": username, "updated_at": now });
            let rows: Vec<UserRecord> = self.write(request, &body).await?;

            existing.username = username.to_string();
            existing.updated_at = now;
            return Ok(rows.into_iter().next().unwrap_or(existing));
        }

        let request = self.client.post(self.table("users"));
        let body = UserRecord::new(user_id, username, now);
        let rows = self.write(request, &body).await?;

        Self::single(rows, "new user")
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        let rows: Vec<UserRecord> = self
            .fetch(
                "users",
                &[
                    ("select", USER_COLUMNS.to_string()),
                    ("user_id", format!("eq.{}", user_id)),
                ],
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn apply_game(&self, game: &NewGame) -> Result<UserRecord, StoreError> {
        // PostgREST cannot increment in place, so the patch only lands while
        // total_games still holds the value it was computed from.
        for attempt in 1..=APPLY_ATTEMPTS {
            let mut user = self
                .find_user(game.user_id)
                .await?
                .ok_or(StoreError::UnknownUser(game.user_id))?;
            let seen_games = user.total_games;
            user.apply_game(game, Utc::now());

            let request = self.client.patch(self.table("users")).query(&[
                ("user_id", format!("eq.{}", game.user_id)),
                ("total_games", format!("eq.{}", seen_games)),
            ]);
            let body = json!({
                "total_games": user.total_games,
                "total_score": user.total_score,
                "best_score": user.best_score,
                "correct_answers": user.correct_answers,
                "wrong_answers": user.wrong_answers,
                "updated_at": user.updated_at,
            });
            let rows: Vec<UserRecord> = self.write(request, &body).await?;

            if let Some(updated) = rows.into_iter().next() {
                return Ok(updated);
            }
            debug!(
                "Totals of user {} changed concurrently, attempt {}",
                game.user_id, attempt
            );
        }

        Err(StoreError::Contended(game.user_id))
    }

    async fn insert_game(&self, game: &NewGame) -> Result<GameRecord, StoreError> {
        let request = self.client.post(self.table("games"));
        let body = json!({
            "user_id": game.user_id,
            "score": game.score,
            "correct_answers": game.correct_answers,
            "wrong_answers": game.wrong_answers,
            "total_questions": game.total_questions,
            "played_at": Utc::now(),
        });
        let rows = self.write(request, &body).await?;

        Self::single(rows, "new game")
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<UserRecord>, StoreError> {
        self.fetch(
            "users",
            &[
                ("select", USER_COLUMNS.to_string()),
                ("total_games", "gt.0".to_string()),
                ("order", "total_score.desc,best_score.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn user_games(&self, user_id: i64, limit: u32) -> Result<Vec<GameRecord>, StoreError> {
        self.fetch(
            "games",
            &[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "played_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.fetch(
            "users",
            &[
                ("select", USER_COLUMNS.to_string()),
                ("order", "user_id.asc".to_string()),
            ],
        )
        .await
    }

    async fn totals(&self) -> Result<TotalStats, StoreError> {
        let total_users = self.count("users").await?;
        let total_games = self.count("games").await?;

        Ok(TotalStats {
            total_users,
            total_games,
        })
    }
}
