use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    identity::models::PlayerIdentity,
    quiz::{models::FinalResult, session::QuizSession},
    submission::error::SubmitError,
};

/// Body of the "save result" call, built once from a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub user_id: i64,
    pub username: String,
    pub score: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub total_questions: u32,
    pub hints_used: u32,
}

impl SubmissionPayload {
    pub fn new(result: &FinalResult, identity: &PlayerIdentity) -> Self {
        Self {
            user_id: identity.user_id,
            username: identity.username.clone(),
            score: result.score,
            correct_answers: result.correct_count,
            wrong_answers: result.wrong_count,
            total_questions: result.total_questions,
            hints_used: result.hints_used,
        }
    }

    pub fn from_session(
        session: &QuizSession,
        identity: &PlayerIdentity,
    ) -> Result<Self, SubmitError> {
        let result = session.finish()?;
        Ok(Self::new(&result, identity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Submitted,
    Failed(String),
}

impl SubmissionState {
    /// Whether the save trigger should be offered to the player.
    pub fn can_submit(&self) -> bool {
        matches!(self, SubmissionState::Idle | SubmissionState::Failed(_))
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionState::Idle => write!(f, "not saved"),
            SubmissionState::InFlight => write!(f, "saving"),
            SubmissionState::Submitted => write!(f, "saved"),
            SubmissionState::Failed(reason) => write!(f, "save failed: {}", reason),
        }
    }
}
