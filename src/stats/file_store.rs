use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::{fs, sync::Mutex};
use tracing::{debug, info};

use crate::stats::{
    error::StoreError,
    models::{GameRecord, NewGame, TotalStats, UserRecord, rank_users},
    store::StatsStore,
};

const USERS_FILE: &str = "users.json";
const GAMES_FILE: &str = "games.json";

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, UserRecord>,
    games: Vec<GameRecord>,
}

/// Stats kept as two JSON documents in a directory. Every write rewrites the
/// whole document through a temporary file.
pub struct FileStore {
    dir: PathBuf,
    tables: Mutex<Option<Tables>>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tables: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load(&self) -> Result<Tables, StoreError> {
        let users: Vec<UserRecord> = read_json(&self.dir.join(USERS_FILE)).await?;
        let games: Vec<GameRecord> = read_json(&self.dir.join(GAMES_FILE)).await?;

        Ok(Tables {
            users: users.into_iter().map(|u| (u.user_id, u)).collect(),
            games,
        })
    }

    async fn with_tables<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> T,
    ) -> Result<T, StoreError> {
        let mut lock = self.tables.lock().await;
        let tables = self.loaded(&mut lock).await?;
        Ok(f(tables))
    }

    async fn loaded<'a>(&self, slot: &'a mut Option<Tables>) -> Result<&'a mut Tables, StoreError> {
        if slot.is_none() {
            *slot = Some(self.load().await?);
        }

        Ok(slot.get_or_insert_with(Tables::default))
    }

    async fn persist_users(&self, tables: &Tables) -> Result<(), StoreError> {
        let users: Vec<&UserRecord> = tables.users.values().collect();
        write_json(&self.dir.join(USERS_FILE), &users).await
    }

    async fn persist_games(&self, tables: &Tables) -> Result<(), StoreError> {
        write_json(&self.dir.join(GAMES_FILE), &tables.games).await
    }
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match fs::read(path).await {
        Ok(bytes) if bytes.is_empty() => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist yet, starting empty", path.display());
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");

    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl StatsStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn init(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;

        let mut lock = self.tables.lock().await;
        let tables = self.load().await?;
        info!(
            "File stats store loaded {} users and {} games from {}",
            tables.users.len(),
            tables.games.len(),
            self.dir.display()
        );
        *lock = Some(tables);

        Ok(())
    }

    async fn register_user(&self, user_id: i64, username: &str) -> Result<UserRecord, StoreError> {
        let mut lock = self.tables.lock().await;
        let tables = self.loaded(&mut lock).await?;

        let now = Utc::now();
        let user = tables
            .users
            .entry(user_id)
            .and_modify(|u| {
                u.username = username.to_string();
                u.updated_at = now;
            })
            .or_insert_with(|| UserRecord::new(user_id, username, now))
            .clone();

        self.persist_users(tables).await?;
        Ok(user)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        self.with_tables(|t| t.users.get(&user_id).cloned()).await
    }

    async fn apply_game(&self, game: &NewGame) -> Result<UserRecord, StoreError> {
        let mut lock = self.tables.lock().await;
        let tables = self.loaded(&mut lock).await?;

        let user = match tables.users.get_mut(&game.user_id) {
            Some(user) => {
                user.apply_game(game, Utc::now());
                user.clone()
            }
            None => return Err(StoreError::UnknownUser(game.user_id)),
        };

        self.persist_users(tables).await?;
        Ok(user)
    }

    async fn insert_game(&self, game: &NewGame) -> Result<GameRecord, StoreError> {
        let mut lock = self.tables.lock().await;
        let tables = self.loaded(&mut lock).await?;

        let id = tables.games.last().map(|g| g.id + 1).unwrap_or(1);
        let record = GameRecord {
            id,
            user_id: game.user_id,
            score: game.score,
            correct_answers: game.correct_answers,
            wrong_answers: game.wrong_answers,
            total_questions: game.total_questions,
            played_at: Utc::now(),
        };
        tables.games.push(record.clone());

        self.persist_games(tables).await?;
        Ok(record)
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<UserRecord>, StoreError> {
        self.with_tables(|t| rank_users(t.users.values().cloned(), limit))
            .await
    }

    async fn user_games(&self, user_id: i64, limit: u32) -> Result<Vec<GameRecord>, StoreError> {
        self.with_tables(|t| {
            t.games
                .iter()
                .rev()
                .filter(|g| g.user_id == user_id)
                .take(limit as usize)
                .cloned()
                .collect()
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.with_tables(|t| t.users.values().cloned().collect())
            .await
    }

    async fn totals(&self) -> Result<TotalStats, StoreError> {
        self.with_tables(|t| TotalStats {
            total_users: t.users.len() as i64,
            total_games: t.games.len() as i64,
        })
        .await
    }
}
