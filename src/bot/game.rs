use std::{fmt, str::FromStr, sync::Arc};

use dashmap::DashMap;
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use crate::{
    config::config::GameConfig,
    identity::models::PlayerIdentity,
    quiz::{
        error::SessionError,
        models::{Presentation, QuestionBank},
        session::QuizSession,
    },
    submission::submitter::Submission,
};

/// One chat's quiz. `round` changes on every restart so that delayed tasks
/// of an earlier game can recognise themselves as outdated.
#[derive(Debug)]
pub struct ChatGame {
    pub session: QuizSession,
    pub submission: Arc<Submission>,
    pub identity: Option<PlayerIdentity>,
    pub round: u64,
}

impl ChatGame {
    pub fn new(config: GameConfig) -> Self {
        Self {
            session: QuizSession::new(config),
            submission: Arc::new(Submission::new()),
            identity: None,
            round: 0,
        }
    }

    pub fn restart(
        &mut self,
        bank: &QuestionBank,
        identity: PlayerIdentity,
    ) -> Result<&Presentation, SessionError> {
        let presentation = self.session.start(bank)?;

        self.identity = Some(identity);
        self.submission = Arc::new(Submission::new());
        self.round += 1;

        Ok(presentation)
    }

    /// Gives up on a question the chat never received. The session goes back
    /// to idle with its timer cancelled, and pending tasks of the round lapse.
    pub fn abandon(&mut self) {
        self.session.reset();
        self.round += 1;
    }
}

pub type SharedGame = Arc<Mutex<ChatGame>>;

#[derive(Debug, Default)]
pub struct GameRegistry {
    games: DashMap<ChatId, SharedGame>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chat_id: ChatId) -> Option<SharedGame> {
        self.games.get(&chat_id).map(|game| game.value().clone())
    }

    pub fn get_or_create(&self, chat_id: ChatId, config: &GameConfig) -> SharedGame {
        self.games
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(ChatGame::new(config.clone()))))
            .value()
            .clone()
    }
}

/// Payload of the inline buttons the bot sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Play,
    Answer { question_no: usize, position: usize },
    Hint { question_no: usize },
    Save,
    Again,
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackAction::Play => write!(f, "play"),
            CallbackAction::Answer {
                question_no,
                position,
            } => write!(f, "ans:{}:{}", question_no, position),
            CallbackAction::Hint { question_no } => write!(f, "hint:{}", question_no),
            CallbackAction::Save => write!(f, "save"),
            CallbackAction::Again => write!(f, "again"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown button: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for CallbackAction {
    type Err = UnknownAction;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownAction(data.to_string());
        let mut parts = data.split(':');

        let action = match (parts.next(), parts.next(), parts.next()) {
            (Some("play"), None, None) => CallbackAction::Play,
            (Some("save"), None, None) => CallbackAction::Save,
            (Some("again"), None, None) => CallbackAction::Again,
            (Some("hint"), Some(q), None) => CallbackAction::Hint {
                question_no: q.parse().map_err(|_| unknown())?,
            },
            (Some("ans"), Some(q), Some(p)) => CallbackAction::Answer {
                question_no: q.parse().map_err(|_| unknown())?,
                position: p.parse().map_err(|_| unknown())?,
            },
            _ => return Err(unknown()),
        };

        if parts.next().is_some() {
            return Err(unknown());
        }

        Ok(action)
    }
}
