use crate::quiz::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("This result is already saved")]
    AlreadySubmitted,

    #[error("The result is being saved, please wait")]
    InFlight,

    #[error("Results of unidentified players cannot be saved, open the game from Telegram")]
    AnonymousPlayer,

    #[error("Finish the game before saving: {0}")]
    NotFinished(#[from] SessionError),

    #[error("Could not save the result: {0}")]
    Failed(String),
}
