use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const MAX_LIST_LIMIT: u32 = 100;
/// Upper bound on the questions of one reported game.
pub const MAX_QUESTIONS_PER_GAME: i64 = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: String,
    pub total_games: i64,
    pub total_score: i64,
    pub best_score: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(user_id: i64, username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username: username.into(),
            total_games: 0,
            total_score: 0,
            best_score: 0,
            correct_answers: 0,
            wrong_answers: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_game(&mut self, game: &NewGame, now: DateTime<Utc>) {
        self.total_games = self.total_games.saturating_add(1);
        self.total_score = self.total_score.saturating_add(game.score);
        self.best_score = self.best_score.max(game.score);
        self.correct_answers = self.correct_answers.saturating_add(game.correct_answers);
        self.wrong_answers = self.wrong_answers.saturating_add(game.wrong_answers);
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GameRecord {
    pub id: i64,
    pub user_id: i64,
    pub score: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub total_questions: i64,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGame {
    pub user_id: i64,
    pub score: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub total_questions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultRequest {
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub score: i64,
    pub correct_answers: i64,
    #[serde(default)]
    pub wrong_answers: i64,
    #[serde(default)]
    pub total_questions: i64,
    #[serde(default)]
    pub hints_used: i64,
}

impl SaveResultRequest {
    pub fn to_new_game(&self) -> NewGame {
        NewGame {
            user_id: self.user_id,
            score: self.score,
            correct_answers: self.correct_answers,
            wrong_answers: self.wrong_answers,
            total_questions: self.total_questions,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_games: i64,
    pub total_score: i64,
    pub best_score: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    pub average_score: f64,
}

impl From<&UserRecord> for UserStats {
    fn from(user: &UserRecord) -> Self {
        let average_score = match user.total_games {
            0 => 0.0,
            games => user.total_score as f64 / games as f64,
        };

        Self {
            total_games: user.total_games,
            total_score: user.total_score,
            best_score: user.best_score,
            correct_answers: user.correct_answers,
            wrong_answers: user.wrong_answers,
            average_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_score: i64,
    pub total_games: i64,
    pub best_score: i64,
}

impl From<UserRecord> for LeaderboardEntry {
    fn from(user: UserRecord) -> Self {
        Self {
            username: user.username,
            total_score: user.total_score,
            total_games: user.total_games,
            best_score: user.best_score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    pub total_users: i64,
    pub total_games: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub total_found: usize,
    pub updated: usize,
}

/// Players who finished at least one game, best first: total score, then best
/// single-game score.
pub fn rank_users(users: impl IntoIterator<Item = UserRecord>, limit: u32) -> Vec<UserRecord> {
    let mut ranked: Vec<UserRecord> = users.into_iter().filter(|u| u.total_games > 0).collect();
    ranked.sort_by_key(|u| (Reverse(u.total_score), Reverse(u.best_score)));
    ranked.truncate(limit as usize);
    ranked
}

pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}
