use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::{
    identity::models::placeholder_name,
    stats::{
        error::{StatsError, StoreError},
        models::{
            GameRecord, LeaderboardEntry, MAX_QUESTIONS_PER_GAME, NewGame, RefreshReport,
            SaveResultRequest, TotalStats, UserStats, clamp_limit,
        },
        store::StatsStore,
    },
    submission::{
        error::SubmitError,
        models::SubmissionPayload,
        submitter::{ResultService, SaveAck},
    },
};

/// Source of a player's current display name, used to repair stored names.
#[async_trait]
pub trait UsernameLookup: Send + Sync {
    async fn lookup_username(&self, user_id: i64) -> Option<String>;
}

/// All stats rules, on top of whichever store is configured.
#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn StatsStore>,
    points_per_correct: u32,
}

impl StatsService {
    pub fn new(store: Arc<dyn StatsStore>, points_per_correct: u32) -> Self {
        Self {
            store,
            points_per_correct,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.totals().await.map(|_| ())
    }

    pub async fn save_result(&self, request: &SaveResultRequest) -> Result<GameRecord, StatsError> {
        let game = self.validated_game(request)?;

        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .unwrap_or_else(|| placeholder_name(request.user_id));

        self.store.register_user(request.user_id, &username).await?;
        let record = self.store.insert_game(&game).await?;
        let user = self.store.apply_game(&game).await?;

        info!(
            "Saved game {} for user {} ({}): {} points",
            record.id, user.user_id, user.username, record.score
        );
        Ok(record)
    }

    /// Checks a reported result and fills in a missing question count.
    /// Counters are bounded before any arithmetic on them.
    fn validated_game(&self, request: &SaveResultRequest) -> Result<NewGame, StatsError> {
        if request.user_id <= 0 {
            return Err(StatsError::Validation("userId must be positive".into()));
        }

        let counters = [
            request.score,
            request.correct_answers,
            request.wrong_answers,
            request.total_questions,
            request.hints_used,
        ];
        if counters.iter().any(|c| *c < 0) {
            return Err(StatsError::Validation(
                "Counters must not be negative".into(),
            ));
        }

        let answered = request
            .correct_answers
            .checked_add(request.wrong_answers)
            .filter(|answered| *answered <= MAX_QUESTIONS_PER_GAME)
            .ok_or_else(|| {
                StatsError::Validation(format!(
                    "At most {} answers can be reported for one game",
                    MAX_QUESTIONS_PER_GAME
                ))
            })?;

        let mut game = request.to_new_game();
        if game.total_questions == 0 {
            game.total_questions = answered;
        }

        if game.total_questions > MAX_QUESTIONS_PER_GAME {
            return Err(StatsError::Validation(format!(
                "A game has at most {} questions",
                MAX_QUESTIONS_PER_GAME
            )));
        }

        if answered > game.total_questions {
            return Err(StatsError::Validation(format!(
                "{} answers reported for {} questions",
                answered, game.total_questions
            )));
        }

        let max_score = i64::from(self.points_per_correct)
            .checked_mul(game.total_questions)
            .unwrap_or(i64::MAX);
        if game.score > max_score {
            return Err(StatsError::Validation(format!(
                "Score {} exceeds the maximum of {}",
                game.score, max_score
            )));
        }

        Ok(game)
    }

    pub async fn user_stats(&self, user_id: i64) -> Result<UserStats, StatsError> {
        let stats = self
            .store
            .find_user(user_id)
            .await?
            .map(|user| UserStats::from(&user))
            .unwrap_or_default();

        Ok(stats)
    }

    pub async fn leaderboard(&self, limit: Option<u32>) -> Result<Vec<LeaderboardEntry>, StatsError> {
        let users = self.store.leaderboard(clamp_limit(limit)).await?;
        Ok(users.into_iter().map(LeaderboardEntry::from).collect())
    }

    pub async fn user_games(
        &self,
        user_id: i64,
        limit: Option<u32>,
    ) -> Result<Vec<GameRecord>, StatsError> {
        Ok(self.store.user_games(user_id, clamp_limit(limit)).await?)
    }

    pub async fn totals(&self) -> Result<TotalStats, StatsError> {
        Ok(self.store.totals().await?)
    }

    /// Asks `lookup` for every stored user's current name and stores the ones
    /// that changed. Waits `pause` between users to stay under API limits.
    pub async fn refresh_usernames(
        &self,
        lookup: &dyn UsernameLookup,
        pause: Duration,
    ) -> Result<RefreshReport, StatsError> {
        let users = self.store.list_users().await?;
        let mut report = RefreshReport {
            total_found: users.len(),
            updated: 0,
        };
        info!("Refreshing usernames of {} users", report.total_found);

        for (i, user) in users.into_iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            let Some(name) = lookup.lookup_username(user.user_id).await else {
                debug!("No name found for user {}", user.user_id);
                continue;
            };

            if name == user.username {
                continue;
            }

            // Only the name is written, so totals of concurrent saves survive.
            match self.store.register_user(user.user_id, &name).await {
                Ok(_) => {
                    info!("Updated user {}: {} -> {}", user.user_id, user.username, name);
                    report.updated += 1;
                }
                Err(e) => error!("Failed to update user {}: {}", user.user_id, e),
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl ResultService for StatsService {
    async fn save_result(&self, payload: &SubmissionPayload) -> Result<SaveAck, SubmitError> {
        let request = SaveResultRequest {
            user_id: payload.user_id,
            username: Some(payload.username.clone()),
            score: i64::from(payload.score),
            correct_answers: i64::from(payload.correct_answers),
            wrong_answers: i64::from(payload.wrong_answers),
            total_questions: i64::from(payload.total_questions),
            hints_used: i64::from(payload.hints_used),
        };

        match StatsService::save_result(self, &request).await {
            Ok(record) => {
                let data = serde_json::to_value(record)
                    .map_err(|e| SubmitError::Failed(e.to_string()))?;
                Ok(SaveAck::ok(data).with_message("Result saved successfully"))
            }
            Err(StatsError::Validation(msg)) => Ok(SaveAck::failure(msg)),
            Err(e) => Err(SubmitError::Failed(e.to_string())),
        }
    }
}
