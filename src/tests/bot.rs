#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use teloxide::types::{ChatId, InlineKeyboardButtonKind, InlineKeyboardMarkup};

    use crate::{
        bot::{
            game::{CallbackAction, ChatGame, GameRegistry, UnknownAction},
            keyboard::{play_keyboard, question_keyboard, result_keyboard},
            render::{
                hint_notice, leaderboard_text, question_text, result_text, stats_text, submit_text,
            },
        },
        config::config::GameConfig,
        identity::models::PlayerIdentity,
        quiz::{
            error::PhaseKind,
            models::{FinalResult, Outcome},
            timer::TimerHandle,
        },
        stats::models::{LeaderboardEntry, UserStats},
        submission::error::SubmitError,
        tests::support::helpers::{bank, started_session},
    };

    fn callbacks(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn callback_actions_round_trip() {
        let actions = [
            CallbackAction::Play,
            CallbackAction::Answer {
                question_no: 3,
                position: 1,
            },
            CallbackAction::Hint { question_no: 9 },
            CallbackAction::Save,
            CallbackAction::Again,
        ];

        for action in actions {
            assert_eq!(action.to_string().parse::<CallbackAction>(), Ok(action));
        }
        assert_eq!(
            CallbackAction::Answer {
                question_no: 3,
                position: 1
            }
            .to_string(),
            "ans:3:1"
        );
    }

    #[test]
    fn garbage_callbacks_are_rejected() {
        for data in ["", "ans:1", "ans:x:1", "hint", "play:1", "save:now", "ans:1:2:3", "nope"] {
            assert_eq!(
                data.parse::<CallbackAction>(),
                Err(UnknownAction(data.to_string())),
                "{}",
                data
            );
        }
    }

    #[test]
    fn question_keyboard_offers_visible_answers_and_hint() {
        let session = started_session(3);
        let presentation = session.presentation().unwrap();

        let keyboard = question_keyboard(presentation, 2);
        let data = callbacks(&keyboard);

        assert_eq!(data, vec!["ans:0:0", "ans:0:1", "ans:0:2", "ans:0:3", "hint:0"]);
        assert_eq!(
            keyboard.inline_keyboard[0][0].text,
            format!("A. {}", presentation.answers[0])
        );
        assert_eq!(keyboard.inline_keyboard[4][0].text, "💡 Hint (2 left)");
    }

    #[test]
    fn question_keyboard_drops_hidden_answers() {
        let mut session = started_session(3);
        let hidden = session.use_hint(0).unwrap();
        let presentation = session.presentation().unwrap();

        let data = callbacks(&question_keyboard(presentation, session.hints_remaining()));

        assert_eq!(data.len(), 3);
        for position in hidden {
            assert!(!data.contains(&format!("ans:0:{}", position)));
        }
        assert!(data.contains(&format!("ans:0:{}", presentation.correct_position)));
        assert!(data.contains(&"hint:0".to_string()));
    }

    #[test]
    fn question_keyboard_without_hints_left() {
        let session = started_session(4);
        let presentation = session.presentation().unwrap();

        let data = callbacks(&question_keyboard(presentation, 0));

        assert_eq!(data.len(), 4);
        assert!(data.iter().all(|d| d.starts_with("ans:")));
    }

    #[test]
    fn result_keyboard_hides_save_after_submission() {
        assert_eq!(callbacks(&result_keyboard(true)), vec!["save", "again"]);
        assert_eq!(callbacks(&result_keyboard(false)), vec!["again"]);
    }

    #[test]
    fn play_keyboard_links_the_web_app() {
        let url = "https://quiz.example.org/".parse().unwrap();

        let with_app = play_keyboard(Some(&url));
        assert_eq!(with_app.inline_keyboard.len(), 2);
        assert!(matches!(
            &with_app.inline_keyboard[0][0].kind,
            InlineKeyboardButtonKind::WebApp(info) if info.url == url
        ));

        assert_eq!(callbacks(&play_keyboard(None)), vec!["play"]);
    }

    #[test]
    fn question_text_lists_answers_and_timer() {
        let session = started_session(5);
        let presentation = session.presentation().unwrap();

        let text = question_text(presentation, 10, 15, 2);

        assert!(text.starts_with("❓ Question 1/10"));
        assert!(text.contains(&presentation.prompt));
        assert!(text.contains(&format!("D. {}", presentation.answers[3])));
        assert!(text.contains("⏱ 15s"));
    }

    #[test]
    fn result_and_stats_texts() {
        let result = FinalResult {
            score: 70,
            correct_count: 7,
            wrong_count: 3,
            total_questions: 10,
            hints_used: 1,
        };
        let text = result_text(&result);
        assert!(text.contains("Score: 70"));
        assert!(text.contains("Accuracy: 70%"));

        assert!(stats_text(&UserStats::default()).contains("not saved any games"));

        let stats = UserStats {
            total_games: 2,
            total_score: 110,
            best_score: 70,
            correct_answers: 11,
            wrong_answers: 9,
            average_score: 55.0,
        };
        assert!(stats_text(&stats).contains("Average: 55.0"));
    }

    #[test]
    fn leaderboard_text_uses_medals() {
        let entry = |name: &str, score| LeaderboardEntry {
            username: name.to_string(),
            total_score: score,
            total_games: 1,
            best_score: score,
        };
        let entries = vec![entry("a", 90), entry("b", 80), entry("c", 70), entry("d", 60)];

        let text = leaderboard_text(&entries);

        assert!(text.contains("🥇 a: 90 pts"));
        assert!(text.contains("🥉 c"));
        assert!(text.contains("4. d"));
        assert!(leaderboard_text(&[]).contains("Nobody"));
    }

    #[test]
    fn submit_text_explains_failures() {
        assert!(submit_text(&Ok(())).contains("Result saved"));
        assert!(
            submit_text(&Err(SubmitError::Failed("timeout".into())))
                .contains("Could not save the result: timeout")
        );
        assert_eq!(
            submit_text(&Err(SubmitError::AlreadySubmitted)),
            "This result is already saved."
        );
    }

    #[test]
    fn outcome_reports_the_correct_position() {
        let outcome = Outcome::Wrong {
            selected: 1,
            correct_position: 3,
        };
        assert_eq!(outcome.correct_position(), 3);
        assert!(!outcome.is_correct());
    }

    #[tokio::test]
    async fn registry_shares_one_game_per_chat() {
        let registry = GameRegistry::new();
        let config = GameConfig::default();

        assert!(registry.get(ChatId(1)).is_none());
        let first = registry.get_or_create(ChatId(1), &config);
        let again = registry.get_or_create(ChatId(1), &config);
        let other = registry.get_or_create(ChatId(2), &config);

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert!(Arc::ptr_eq(&first, &registry.get(ChatId(1)).unwrap()));
    }

    #[tokio::test]
    async fn restart_begins_a_fresh_round() {
        let bank = bank(20, 1);
        let mut game = ChatGame::new(GameConfig::default());
        assert_eq!(game.round, 0);

        game.restart(&bank, PlayerIdentity::new(5, "eve")).unwrap();
        let first_submission = game.submission.clone();
        assert_eq!(game.round, 1);
        assert_eq!(game.identity, Some(PlayerIdentity::new(5, "eve")));
        assert_eq!(game.session.current_index(), 0);

        game.restart(&bank, PlayerIdentity::new(5, "eve")).unwrap();
        assert_eq!(game.round, 2);
        assert!(!Arc::ptr_eq(&first_submission, &game.submission));
    }

    #[test]
    fn hint_notice_counts_removed_answers() {
        assert_eq!(hint_notice(2, 1), "💡 2 wrong answers removed, 1 hints left");
        assert_eq!(hint_notice(1, 0), "💡 1 wrong answer removed, 0 hints left");
    }

    #[test]
    fn second_hint_on_a_question_removes_one_answer() {
        let mut session = started_session(6);

        assert_eq!(session.use_hint(0).unwrap().len(), 2);
        let second = session.use_hint(0).unwrap();

        assert_eq!(second.len(), 1);
        assert!(hint_notice(second.len(), session.hints_remaining()).contains("1 wrong answer removed"));
    }

    #[test]
    fn anonymous_save_is_explained() {
        assert!(submit_text(&Err(SubmitError::AnonymousPlayer)).contains("Telegram account"));
    }

    #[tokio::test]
    async fn abandoned_game_can_start_again() {
        let bank = bank(20, 1);
        let mut game = ChatGame::new(GameConfig::default());
        game.restart(&bank, PlayerIdentity::new(5, "eve")).unwrap();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = started_tx.send(());
            std::future::pending::<()>().await;
        });
        started_rx.await.unwrap();
        game.session.attach_timer(TimerHandle::new(task.abort_handle()));
        assert!(game.session.has_timer());

        game.abandon();

        assert_eq!(game.round, 2);
        assert_eq!(game.session.phase(), PhaseKind::Idle);
        assert!(!game.session.has_timer());
        assert!(game.session.timeout(0).is_err());
        assert!(task.await.unwrap_err().is_cancelled());

        game.restart(&bank, PlayerIdentity::new(5, "eve")).unwrap();
        assert_eq!(game.round, 3);
        assert_eq!(game.session.phase(), PhaseKind::InQuestion);
    }
}
