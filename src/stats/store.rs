use async_trait::async_trait;

use crate::stats::{
    error::StoreError,
    models::{GameRecord, NewGame, TotalStats, UserRecord},
};

/// Persistence primitives shared by every storage backend. Aggregation,
/// validation and defaults live in `StatsService`.
#[async_trait]
pub trait StatsStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn init(&self) -> Result<(), StoreError>;

    /// Creates the user, or refreshes the username of an existing one.
    async fn register_user(&self, user_id: i64, username: &str) -> Result<UserRecord, StoreError>;

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError>;

    /// Folds one game into the user's totals as a single step and returns
    /// the updated user. Fails with `UnknownUser` for unregistered users.
    async fn apply_game(&self, game: &NewGame) -> Result<UserRecord, StoreError>;

    async fn insert_game(&self, game: &NewGame) -> Result<GameRecord, StoreError>;

    async fn leaderboard(&self, limit: u32) -> Result<Vec<UserRecord>, StoreError>;

    async fn user_games(&self, user_id: i64, limit: u32) -> Result<Vec<GameRecord>, StoreError>;

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;

    async fn totals(&self) -> Result<TotalStats, StoreError>;
}
