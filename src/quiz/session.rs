use rand::{SeedableRng, seq::IndexedRandom};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::{
    config::config::GameConfig,
    quiz::{
        error::{Command, PhaseKind, SessionError},
        models::{FinalResult, Outcome, Presentation, Question, QuestionBank},
        timer::{Countdown, TimerHandle},
    },
};

/// How many wrong answers a single hint removes.
pub const HINT_HIDE_COUNT: usize = 2;

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    InQuestion(Presentation),
    Answered {
        presentation: Presentation,
        outcome: Outcome,
    },
    Finished,
}

impl Phase {
    fn kind(&self) -> PhaseKind {
        match self {
            Phase::Idle => PhaseKind::Idle,
            Phase::InQuestion(_) => PhaseKind::InQuestion,
            Phase::Answered { .. } => PhaseKind::Answered,
            Phase::Finished => PhaseKind::Finished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining: u32 },
    Expired(Outcome),
    Stale,
}

/// One play-through. `current_index` counts resolved questions, so it moves
/// forward as soon as an answer or timeout is recorded and the question on
/// screen during `Answered` is `current_index - 1`.
#[derive(Debug)]
pub struct QuizSession {
    config: GameConfig,
    rng: ChaCha8Rng,
    questions: Vec<Question>,
    current_index: usize,
    score: u32,
    correct_count: u32,
    wrong_count: u32,
    hints_remaining: u32,
    phase: Phase,
    countdown: Countdown,
    timer: Option<TimerHandle>,
}

impl QuizSession {
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_os_rng())
    }

    pub fn with_rng(config: GameConfig, rng: ChaCha8Rng) -> Self {
        let hints_remaining = config.max_hints;
        let countdown = Countdown::new(config.question_seconds);

        Self {
            config,
            rng,
            questions: Vec::new(),
            current_index: 0,
            score: 0,
            correct_count: 0,
            wrong_count: 0,
            hints_remaining,
            phase: Phase::Idle,
            countdown,
            timer: None,
        }
    }

    pub fn start(&mut self, bank: &QuestionBank) -> Result<&Presentation, SessionError> {
        let questions = bank.random_questions(self.config.questions_per_game, &mut self.rng)?;

        self.reset();
        self.questions = questions;
        debug!("Starting quiz session with {} questions", self.questions.len());

        Ok(self.load_question())
    }

    pub fn reset(&mut self) {
        self.cancel_timer();
        self.questions.clear();
        self.current_index = 0;
        self.score = 0;
        self.correct_count = 0;
        self.wrong_count = 0;
        self.hints_remaining = self.config.max_hints;
        self.countdown = Countdown::new(self.config.question_seconds);
        self.phase = Phase::Idle;
    }

    fn load_question(&mut self) -> &Presentation {
        let question = &self.questions[self.current_index];
        let presentation = Presentation::shuffled(self.current_index, question, &mut self.rng);

        self.countdown = Countdown::new(self.config.question_seconds);
        self.phase = Phase::InQuestion(presentation);

        match &self.phase {
            Phase::InQuestion(presentation) => presentation,
            _ => unreachable!("phase was just set to InQuestion"),
        }
    }

    fn active_question(
        &mut self,
        command: Command,
        question_no: usize,
    ) -> Result<&mut Presentation, SessionError> {
        let phase = self.phase.kind();
        let Phase::InQuestion(presentation) = &mut self.phase else {
            return Err(SessionError::InvalidTransition { command, phase });
        };

        if presentation.question_no != question_no {
            return Err(SessionError::StaleQuestion {
                expected: presentation.question_no,
                got: question_no,
            });
        }

        Ok(presentation)
    }

    pub fn answer(&mut self, question_no: usize, position: usize) -> Result<Outcome, SessionError> {
        let presentation = self.active_question(Command::Answer, question_no)?;
        if !presentation.is_selectable(position) {
            return Err(SessionError::AnswerUnavailable(position));
        }

        Ok(self.resolve(Some(position)))
    }

    pub fn timeout(&mut self, question_no: usize) -> Result<Outcome, SessionError> {
        self.active_question(Command::Timeout, question_no)?;
        Ok(self.resolve(None))
    }

    /// Timer callback, one call per elapsed second.
    pub fn tick(&mut self, question_no: usize) -> Tick {
        if self.active_question(Command::Timeout, question_no).is_err() {
            return Tick::Stale;
        }

        let remaining = self.countdown.tick();
        if remaining > 0 {
            return Tick::Running { remaining };
        }

        // The expiring timer is the caller; drop its handle without aborting it.
        self.timer.take();
        Tick::Expired(self.resolve(None))
    }

    fn resolve(&mut self, selected: Option<usize>) -> Outcome {
        self.cancel_timer();

        let presentation = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::InQuestion(presentation) => presentation,
            other => unreachable!("resolve called in phase {:?}", other.kind()),
        };

        let correct_position = presentation.correct_position;
        let outcome = match selected {
            Some(position) if position == correct_position => Outcome::Correct { position },
            Some(selected) => Outcome::Wrong {
                selected,
                correct_position,
            },
            None => Outcome::TimedOut { correct_position },
        };

        if outcome.is_correct() {
            self.correct_count += 1;
            self.score += self.config.points_per_correct;
        } else {
            self.wrong_count += 1;
        }

        self.current_index += 1;
        debug!(
            "Question {} resolved as {:?}",
            presentation.question_no, outcome
        );
        self.phase = Phase::Answered {
            presentation,
            outcome,
        };

        outcome
    }

    /// Hides up to two wrong answers of the current question and returns the
    /// newly hidden positions.
    pub fn use_hint(&mut self, question_no: usize) -> Result<Vec<usize>, SessionError> {
        let hints_remaining = self.hints_remaining;
        let presentation = self.active_question(Command::UseHint, question_no)?;

        if hints_remaining == 0 {
            return Err(SessionError::HintsExhausted);
        }

        let candidates = presentation.hideable_positions();
        if candidates.is_empty() {
            return Err(SessionError::NothingToHide);
        }

        let hidden: Vec<usize> = candidates
            .choose_multiple(&mut self.rng, HINT_HIDE_COUNT)
            .copied()
            .collect();

        if let Phase::InQuestion(presentation) = &mut self.phase {
            for position in &hidden {
                presentation.hide(*position);
            }
        }

        self.hints_remaining -= 1;
        Ok(hidden)
    }

    /// Leaves `Answered`: shows the next question, or finishes the game after
    /// the last one.
    pub fn advance(&mut self) -> Result<Option<&Presentation>, SessionError> {
        if !matches!(self.phase, Phase::Answered { .. }) {
            return Err(SessionError::InvalidTransition {
                command: Command::Advance,
                phase: self.phase.kind(),
            });
        }

        if self.current_index >= self.questions.len() {
            self.cancel_timer();
            self.phase = Phase::Finished;
            return Ok(None);
        }

        Ok(Some(self.load_question()))
    }

    pub fn finish(&self) -> Result<FinalResult, SessionError> {
        if !matches!(self.phase, Phase::Finished) {
            return Err(SessionError::InvalidTransition {
                command: Command::Finish,
                phase: self.phase.kind(),
            });
        }

        Ok(FinalResult {
            score: self.score,
            correct_count: self.correct_count,
            wrong_count: self.wrong_count,
            total_questions: self.questions.len() as u32,
            hints_used: self.hints_used(),
        })
    }

    /// Owns the countdown task of the current question. A handle offered
    /// outside `InQuestion` is cancelled straight away.
    pub fn attach_timer(&mut self, handle: TimerHandle) {
        if !matches!(self.phase, Phase::InQuestion(_)) {
            handle.cancel();
            return;
        }

        self.cancel_timer();
        self.timer = Some(handle);
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    pub fn phase(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// The question on screen, during `InQuestion` and `Answered`.
    pub fn presentation(&self) -> Option<&Presentation> {
        match &self.phase {
            Phase::InQuestion(presentation) | Phase::Answered { presentation, .. } => {
                Some(presentation)
            }
            _ => None,
        }
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        match &self.phase {
            Phase::Answered { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn wrong_count(&self) -> u32 {
        self.wrong_count
    }

    pub fn hints_remaining(&self) -> u32 {
        self.hints_remaining
    }

    pub fn hints_used(&self) -> u32 {
        self.config.max_hints - self.hints_remaining
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }
}
