use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::identity::models::PlayerIdentity;

pub static CONFIG: Lazy<AppConfig> =
    Lazy::new(|| AppConfig::load().unwrap_or_else(|e| panic!("Failed to load config: {}", e)));

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub bot: BotConfig,
    pub game: GameConfig,
    #[serde(default)]
    pub stats_api: StatsApiConfig,
    /// Used when no host user is known. A non-positive id marks the player as
    /// anonymous, whose results are never saved.
    pub fallback_identity: PlayerIdentity,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub log_level: String,
    pub cors_origin: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    File,
    Supabase,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    pub data_dir: String,
    pub supabase_url: String,
    pub supabase_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub token: String,
    pub webapp_url: String,
    pub webhook_url: Option<String>,
    pub webhook_addr: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    pub questions_per_game: usize,
    pub question_seconds: u32,
    pub max_hints: u32,
    pub answer_delay_ms: u64,
    pub points_per_correct: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            questions_per_game: 10,
            question_seconds: 15,
            max_hints: 2,
            answer_delay_ms: 2000,
            points_per_correct: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StatsApiConfig {
    pub base_url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let game = GameConfig::default();

        Config::builder()
            .set_default("server.address", "0.0.0.0")?
            .set_default("server.port", 3000_i64)?
            .set_default("server.log_level", "info")?
            .set_default("server.cors_origin", "*")?
            .set_default("storage.backend", "file")?
            .set_default("storage.database_url", "")?
            .set_default("storage.data_dir", "data/store")?
            .set_default("storage.supabase_url", "")?
            .set_default("storage.supabase_key", "")?
            .set_default("bot.token", "")?
            .set_default("bot.webapp_url", "")?
            .set_default("game.questions_per_game", game.questions_per_game as i64)?
            .set_default("game.question_seconds", i64::from(game.question_seconds))?
            .set_default("game.max_hints", i64::from(game.max_hints))?
            .set_default("game.answer_delay_ms", game.answer_delay_ms as i64)?
            .set_default("game.points_per_correct", i64::from(game.points_per_correct))?
            .set_default("fallback_identity.user_id", 0_i64)?
            .set_default("fallback_identity.username", "Guest")?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("QUIZBOT").separator("__"))
            .build()?
            .try_deserialize()
    }
}
