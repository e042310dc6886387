use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    common::models::ApiResponse,
    identity::models::PlayerIdentity,
    quiz::session::QuizSession,
    submission::{
        error::SubmitError,
        models::{SubmissionPayload, SubmissionState},
    },
};

/// Acknowledgement of a save, in the shape the stats API answers with. The
/// data part is opaque to the client.
pub type SaveAck = ApiResponse<serde_json::Value>;

/// The "save result" operation of the stats service.
#[async_trait]
pub trait ResultService: Send + Sync {
    async fn save_result(&self, payload: &SubmissionPayload) -> Result<SaveAck, SubmitError>;
}

/// Submission state of one session. The lock is only held for state
/// changes, never across the network call.
#[derive(Debug, Default)]
pub struct Submission {
    state: Mutex<SubmissionState>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SubmissionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SubmissionState {
        self.lock().clone()
    }

    pub fn is_submitted(&self) -> bool {
        matches!(*self.lock(), SubmissionState::Submitted)
    }

    /// Back to `Idle`, for "play again".
    pub fn reset(&self) {
        *self.lock() = SubmissionState::Idle;
    }

    pub async fn submit(
        &self,
        service: &dyn ResultService,
        session: &QuizSession,
        identity: &PlayerIdentity,
    ) -> Result<(), SubmitError> {
        if self.is_submitted() {
            return Err(SubmitError::AlreadySubmitted);
        }

        let payload = SubmissionPayload::from_session(session, identity)?;
        self.send(service, &payload).await
    }

    /// Sends a payload that was built earlier. The in-flight mark is set
    /// before the first await. A player without a real id is refused without
    /// touching the state, since no retry could succeed.
    pub async fn send(
        &self,
        service: &dyn ResultService,
        payload: &SubmissionPayload,
    ) -> Result<(), SubmitError> {
        if payload.user_id <= 0 {
            warn!("Refusing to save a result without a player id");
            return Err(SubmitError::AnonymousPlayer);
        }

        self.begin()?;
        debug!("Submitting result for user {}", payload.user_id);

        let outcome = match service.save_result(payload).await {
            Ok(ack) if ack.success => Ok(()),
            Ok(ack) => Err(ack
                .error
                .unwrap_or_else(|| "the service rejected the result".into())),
            Err(SubmitError::Failed(reason)) => Err(reason),
            Err(e) => Err(e.to_string()),
        };

        let mut state = self.lock();
        match outcome {
            Ok(()) => {
                info!(
                    "Saved result of user {}: {} points",
                    payload.user_id, payload.score
                );
                *state = SubmissionState::Submitted;
                Ok(())
            }
            Err(reason) => {
                warn!("Saving result of user {} failed: {}", payload.user_id, reason);
                *state = SubmissionState::Failed(reason.clone());
                Err(SubmitError::Failed(reason))
            }
        }
    }

    fn begin(&self) -> Result<(), SubmitError> {
        let mut state = self.lock();
        match *state {
            SubmissionState::Submitted => Err(SubmitError::AlreadySubmitted),
            SubmissionState::InFlight => Err(SubmitError::InFlight),
            SubmissionState::Idle | SubmissionState::Failed(_) => {
                *state = SubmissionState::InFlight;
                Ok(())
            }
        }
    }
}
