use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Answer,
    Timeout,
    UseHint,
    Advance,
    Finish,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Answer => write!(f, "answer"),
            Command::Timeout => write!(f, "time out"),
            Command::UseHint => write!(f, "use a hint"),
            Command::Advance => write!(f, "move to the next question"),
            Command::Finish => write!(f, "finish"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    InQuestion,
    Answered,
    Finished,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::Idle => write!(f, "not started"),
            PhaseKind::InQuestion => write!(f, "waiting for an answer"),
            PhaseKind::Answered => write!(f, "showing the answer"),
            PhaseKind::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Cannot {command} while the game is {phase}")]
    InvalidTransition { command: Command, phase: PhaseKind },

    #[error("Question {got} is no longer active, the current one is {expected}")]
    StaleQuestion { expected: usize, got: usize },

    #[error("No hints left")]
    HintsExhausted,

    #[error("Nothing left to hide on this question")]
    NothingToHide,

    #[error("Answer {0} cannot be selected")]
    AnswerUnavailable(usize),

    #[error("Question bank has {available} questions but {needed} are required")]
    InsufficientQuestions { needed: usize, available: usize },

    #[error("Question bank is invalid: {0}")]
    InvalidBank(String),
}
