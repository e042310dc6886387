#[cfg(test)]
pub mod helpers {
    use std::{path::PathBuf, sync::Arc};

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tracing::level_filters::LevelFilter;
    use uuid::Uuid;

    use crate::{
        config::config::GameConfig,
        quiz::{
            models::{Outcome, Question, QuestionBank},
            session::QuizSession,
        },
        stats::{file_store::FileStore, service::StatsService, store::StatsStore},
    };

    pub fn setup_logging() {
        let _ = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    }

    pub fn question(id: u32, correct_index: usize) -> Question {
        Question {
            id,
            prompt: format!("Question {}?", id),
            answers: std::array::from_fn(|i| format!("q{}-answer{}", id, i)),
            correct_index,
        }
    }

    pub fn bank(size: u32, correct_index: usize) -> QuestionBank {
        let questions = (1..=size).map(|id| question(id, correct_index)).collect();
        QuestionBank::new(questions).unwrap()
    }

    pub fn seeded_session(seed: u64) -> QuizSession {
        QuizSession::with_rng(GameConfig::default(), ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn started_session(seed: u64) -> QuizSession {
        let mut session = seeded_session(seed);
        session.start(&bank(20, 2)).unwrap();
        session
    }

    /// Plays every question, answering the first `correct` ones right and the
    /// rest wrong.
    pub fn play_to_end(session: &mut QuizSession, correct: usize) {
        let mut question_no = 0;
        loop {
            let presentation = session.presentation().unwrap().clone();
            let position = if question_no < correct {
                presentation.correct_position
            } else {
                presentation.hideable_positions()[0]
            };

            let outcome = session.answer(question_no, position).unwrap();
            assert_eq!(outcome.is_correct(), question_no < correct);
            assert!(!matches!(outcome, Outcome::TimedOut { .. }));

            if session.advance().unwrap().is_none() {
                break;
            }
            question_no += 1;
        }
    }

    pub fn finished_session(correct: usize) -> QuizSession {
        let mut session = started_session(7);
        play_to_end(&mut session, correct);
        session
    }

    pub fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("quiz-platform-test-{}", Uuid::new_v4()))
    }

    pub async fn file_service() -> (StatsService, Arc<FileStore>) {
        let store = Arc::new(FileStore::new(temp_dir()));
        store.init().await.unwrap();

        let service = StatsService::new(store.clone(), GameConfig::default().points_per_correct);
        (service, store)
    }
}
