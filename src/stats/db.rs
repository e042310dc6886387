use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};

use crate::stats::{
    error::StoreError,
    models::{GameRecord, NewGame, TotalStats, UserRecord},
    store::StatsStore,
};

pub async fn upsert_user(
    pool: &Pool<Postgres>,
    user_id: i64,
    username: &str,
) -> Result<UserRecord, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO "users" (user_id, username, created_at, updated_at)
        VALUES ($1, $2, $3, $3)
        ON CONFLICT (user_id) DO UPDATE
        SET username = EXCLUDED.username, updated_at = EXCLUDED.updated_at
        RETURNING user_id, username, total_games, total_score, best_score,
            correct_answers, wrong_answers, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(username)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT user_id, username, total_games, total_score, best_score,
            correct_answers, wrong_answers, created_at, updated_at
        FROM "users"
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn add_game_to_user(
    pool: &Pool<Postgres>,
    game: &NewGame,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        UPDATE "users"
        SET total_games = total_games + 1,
            total_score = total_score + $2,
            best_score = GREATEST(best_score, $2),
            correct_answers = correct_answers + $3,
            wrong_answers = wrong_answers + $4,
            updated_at = $5
        WHERE user_id = $1
        RETURNING user_id, username, total_games, total_score, best_score,
            correct_answers, wrong_answers, created_at, updated_at
        "#,
    )
    .bind(game.user_id)
    .bind(game.score)
    .bind(game.correct_answers)
    .bind(game.wrong_answers)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

pub async fn create_game(pool: &Pool<Postgres>, game: &NewGame) -> Result<GameRecord, sqlx::Error> {
    sqlx::query_as::<_, GameRecord>(
        r#"
        INSERT INTO "games" (user_id, score, correct_answers, wrong_answers, total_questions, played_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, score, correct_answers, wrong_answers, total_questions, played_at
        "#,
    )
    .bind(game.user_id)
    .bind(game.score)
    .bind(game.correct_answers)
    .bind(game.wrong_answers)
    .bind(game.total_questions)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn get_leaderboard(
    pool: &Pool<Postgres>,
    limit: u32,
) -> Result<Vec<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT user_id, username, total_games, total_score, best_score,
            correct_answers, wrong_answers, created_at, updated_at
        FROM "users"
        WHERE total_games > 0
        ORDER BY total_score DESC, best_score DESC
        LIMIT $1
        "#,
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await
}

pub async fn get_games_by_user(
    pool: &Pool<Postgres>,
    user_id: i64,
    limit: u32,
) -> Result<Vec<GameRecord>, sqlx::Error> {
    sqlx::query_as::<_, GameRecord>(
        r#"
        SELECT id, user_id, score, correct_answers, wrong_answers, total_questions, played_at
        FROM "games"
        WHERE user_id = $1
        ORDER BY played_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await
}

pub async fn list_all_users(pool: &Pool<Postgres>) -> Result<Vec<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT user_id, username, total_games, total_score, best_score,
            correct_answers, wrong_answers, created_at, updated_at
        FROM "users"
        ORDER BY user_id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_totals(pool: &Pool<Postgres>) -> Result<TotalStats, sqlx::Error> {
    let (total_users, total_games) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM "users") AS total_users,
            (SELECT COUNT(*) FROM "games") AS total_games
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(TotalStats {
        total_users,
        total_games,
    })
}

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        if database_url.is_empty() {
            return Err(StoreError::Config("storage.database_url is empty".into()));
        }

        let pool = Pool::<Postgres>::connect(database_url).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl StatsStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.pool).await?;
        info!("Postgres stats store migrated");
        Ok(())
    }

    async fn register_user(&self, user_id: i64, username: &str) -> Result<UserRecord, StoreError> {
        debug!("Registering user {} as {}", user_id, username);
        Ok(upsert_user(&self.pool, user_id, username).await?)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        Ok(get_user_by_id(&self.pool, user_id).await?)
    }

    async fn apply_game(&self, game: &NewGame) -> Result<UserRecord, StoreError> {
        add_game_to_user(&self.pool, game)
            .await?
            .ok_or(StoreError::UnknownUser(game.user_id))
    }

    async fn insert_game(&self, game: &NewGame) -> Result<GameRecord, StoreError> {
        Ok(create_game(&self.pool, game).await?)
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<UserRecord>, StoreError> {
        Ok(get_leaderboard(&self.pool, limit).await?)
    }

    async fn user_games(&self, user_id: i64, limit: u32) -> Result<Vec<GameRecord>, StoreError> {
        Ok(get_games_by_user(&self.pool, user_id, limit).await?)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(list_all_users(&self.pool).await?)
    }

    async fn totals(&self) -> Result<TotalStats, StoreError> {
        Ok(get_totals(&self.pool).await?)
    }
}
