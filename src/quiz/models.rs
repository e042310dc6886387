use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::quiz::error::SessionError;

pub const ANSWER_COUNT: usize = 4;

static BUNDLED_QUESTIONS: &str = include_str!("../../data/questions.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub answers: [String; ANSWER_COUNT],
    pub correct_index: usize,
}

#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, SessionError> {
        let mut seen = HashSet::new();
        for question in &questions {
            if question.correct_index >= ANSWER_COUNT {
                return Err(SessionError::InvalidBank(format!(
                    "question {} has correct index {}",
                    question.id, question.correct_index
                )));
            }

            if !seen.insert(question.id) {
                return Err(SessionError::InvalidBank(format!(
                    "question id {} appears twice",
                    question.id
                )));
            }
        }

        Ok(Self { questions })
    }

    pub fn bundled() -> Result<Self, SessionError> {
        let questions: Vec<Question> = serde_json::from_str(BUNDLED_QUESTIONS)
            .map_err(|e| SessionError::InvalidBank(e.to_string()))?;

        Self::new(questions)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Draws `count` distinct questions in random order.
    pub fn random_questions<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Question>, SessionError> {
        if count > self.questions.len() {
            return Err(SessionError::InsufficientQuestions {
                needed: count,
                available: self.questions.len(),
            });
        }

        let picked = rand::seq::index::sample(rng, self.questions.len(), count)
            .into_iter()
            .map(|idx| self.questions[idx].clone())
            .collect();

        Ok(picked)
    }
}

/// One question as shown to the player: answers in shuffled order, the
/// position of the correct one in that order, and what hints have hidden.
/// The source `Question` is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub question_no: usize,
    pub question_id: u32,
    pub prompt: String,
    pub answers: [String; ANSWER_COUNT],
    pub correct_position: usize,
    hidden: [bool; ANSWER_COUNT],
}

impl Presentation {
    pub fn shuffled<R: Rng + ?Sized>(question_no: usize, question: &Question, rng: &mut R) -> Self {
        let mut order: [usize; ANSWER_COUNT] = std::array::from_fn(|i| i);
        order.shuffle(rng);

        let answers = order.map(|source| question.answers[source].clone());
        let correct_position = order
            .iter()
            .position(|source| *source == question.correct_index)
            .unwrap_or(question.correct_index);

        Self {
            question_no,
            question_id: question.id,
            prompt: question.prompt.clone(),
            answers,
            correct_position,
            hidden: [false; ANSWER_COUNT],
        }
    }

    pub fn is_hidden(&self, position: usize) -> bool {
        self.hidden.get(position).copied().unwrap_or(false)
    }

    pub fn is_selectable(&self, position: usize) -> bool {
        position < ANSWER_COUNT && !self.hidden[position]
    }

    pub fn visible_positions(&self) -> Vec<usize> {
        (0..ANSWER_COUNT).filter(|p| !self.hidden[*p]).collect()
    }

    pub fn hidden_positions(&self) -> Vec<usize> {
        (0..ANSWER_COUNT).filter(|p| self.hidden[*p]).collect()
    }

    /// Wrong answers still on screen.
    pub fn hideable_positions(&self) -> Vec<usize> {
        (0..ANSWER_COUNT)
            .filter(|p| *p != self.correct_position && !self.hidden[*p])
            .collect()
    }

    pub(crate) fn hide(&mut self, position: usize) {
        if position != self.correct_position && position < ANSWER_COUNT {
            self.hidden[position] = true;
        }
    }

    pub fn correct_answer(&self) -> &str {
        &self.answers[self.correct_position]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct { position: usize },
    Wrong { selected: usize, correct_position: usize },
    TimedOut { correct_position: usize },
}

impl Outcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, Outcome::Correct { .. })
    }

    pub fn correct_position(&self) -> usize {
        match self {
            Outcome::Correct { position } => *position,
            Outcome::Wrong {
                correct_position, ..
            }
            | Outcome::TimedOut { correct_position } => *correct_position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub score: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub total_questions: u32,
    pub hints_used: u32,
}

impl FinalResult {
    /// Rounded percentage of correctly answered questions.
    pub fn accuracy(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }

        ((self.correct_count as f64 / self.total_questions as f64) * 100.0).round() as u32
    }
}
