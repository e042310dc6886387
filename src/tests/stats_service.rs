#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc, time::Duration};

    use async_trait::async_trait;

    use crate::{
        stats::{
            error::{StatsError, StoreError},
            file_store::FileStore,
            models::{
                MAX_LIST_LIMIT, MAX_QUESTIONS_PER_GAME, NewGame, SaveResultRequest, TotalStats,
                clamp_limit,
            },
            service::{StatsService, UsernameLookup},
            store::StatsStore,
        },
        submission::{models::SubmissionPayload, submitter::ResultService},
        tests::support::helpers::{file_service, setup_logging},
    };

    fn request(user_id: i64, username: &str, score: i64, correct: i64) -> SaveResultRequest {
        SaveResultRequest {
            user_id,
            username: Some(username.to_string()),
            score,
            correct_answers: correct,
            wrong_answers: 10 - correct,
            total_questions: 10,
            hints_used: 0,
        }
    }

    struct FakeLookup(HashMap<i64, String>);

    #[async_trait]
    impl UsernameLookup for FakeLookup {
        async fn lookup_username(&self, user_id: i64) -> Option<String> {
            self.0.get(&user_id).cloned()
        }
    }

    #[tokio::test]
    async fn saving_results_accumulates_totals() {
        setup_logging();
        let (service, _) = file_service().await;

        service.save_result(&request(1, "alice", 70, 7)).await.unwrap();
        service.save_result(&request(1, "alice", 40, 4)).await.unwrap();

        let stats = service.user_stats(1).await.unwrap();
        assert_eq!(stats.total_games, 2);
        assert_eq!(stats.total_score, 110);
        assert_eq!(stats.best_score, 70);
        assert_eq!(stats.correct_answers, 11);
        assert_eq!(stats.wrong_answers, 9);
        assert_eq!(stats.average_score, 55.0);
    }

    #[tokio::test]
    async fn unknown_user_has_empty_stats() {
        let (service, _) = file_service().await;

        let stats = service.user_stats(404).await.unwrap();

        assert_eq!(stats.total_games, 0);
        assert_eq!(stats.total_score, 0);
        assert_eq!(stats.average_score, 0.0);
    }

    #[tokio::test]
    async fn blank_username_gets_a_placeholder() {
        let (service, store) = file_service().await;

        let mut req = request(77, "", 10, 1);
        service.save_result(&req).await.unwrap();
        assert_eq!(store.find_user(77).await.unwrap().unwrap().username, "User_77");

        req.username = None;
        service.save_result(&req).await.unwrap();
        assert_eq!(store.find_user(77).await.unwrap().unwrap().username, "User_77");
    }

    #[tokio::test]
    async fn later_save_updates_the_username() {
        let (service, store) = file_service().await;

        service.save_result(&request(5, "old_name", 10, 1)).await.unwrap();
        service.save_result(&request(5, "new_name", 20, 2)).await.unwrap();

        let user = store.find_user(5).await.unwrap().unwrap();
        assert_eq!(user.username, "new_name");
        assert_eq!(user.total_games, 2);
    }

    #[tokio::test]
    async fn leaderboard_is_ordered_by_total_then_best() {
        let (service, store) = file_service().await;

        service.save_result(&request(1, "steady", 50, 5)).await.unwrap();
        service.save_result(&request(1, "steady", 50, 5)).await.unwrap();
        service.save_result(&request(2, "spiky", 100, 10)).await.unwrap();
        service.save_result(&request(3, "top", 80, 8)).await.unwrap();
        service.save_result(&request(3, "top", 70, 7)).await.unwrap();
        store.register_user(4, "lurker").await.unwrap();

        let board = service.leaderboard(None).await.unwrap();
        let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();

        assert_eq!(names, vec!["top", "spiky", "steady"]);
        assert_eq!(board[1].total_score, 100);
        assert_eq!(board[1].best_score, 100);
        assert_eq!(board[2].total_games, 2);
    }

    #[tokio::test]
    async fn leaderboard_respects_the_limit() {
        let (service, _) = file_service().await;
        for user_id in 1..=5 {
            service
                .save_result(&request(user_id, &format!("p{}", user_id), user_id * 10, user_id))
                .await
                .unwrap();
        }

        let board = service.leaderboard(Some(2)).await.unwrap();

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].username, "p5");
        assert_eq!(board[1].username, "p4");
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(25)), 25);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIST_LIMIT);
    }

    #[tokio::test]
    async fn invalid_results_are_rejected() {
        let (service, store) = file_service().await;

        let cases = [
            SaveResultRequest { user_id: 0, ..request(1, "a", 10, 1) },
            SaveResultRequest { score: -1, ..request(1, "a", 10, 1) },
            SaveResultRequest { correct_answers: 11, ..request(1, "a", 10, 1) },
            SaveResultRequest { score: 101, ..request(1, "a", 10, 1) },
        ];

        for case in cases {
            let result = service.save_result(&case).await;
            assert!(matches!(result, Err(StatsError::Validation(_))), "{:?}", case);
        }

        assert_eq!(store.totals().await.unwrap(), TotalStats::default());
    }

    #[tokio::test]
    async fn missing_total_is_derived_from_answers() {
        let (service, _) = file_service().await;

        let req = SaveResultRequest {
            total_questions: 0,
            ..request(9, "casual", 30, 3)
        };
        let record = service.save_result(&req).await.unwrap();

        assert_eq!(record.total_questions, 10);
    }

    #[tokio::test]
    async fn user_games_are_newest_first() {
        let (service, _) = file_service().await;

        for score in [10, 20, 30] {
            service.save_result(&request(3, "c", score, score / 10)).await.unwrap();
        }
        service.save_result(&request(4, "d", 90, 9)).await.unwrap();

        let games = service.user_games(3, None).await.unwrap();
        let scores: Vec<i64> = games.iter().map(|g| g.score).collect();
        assert_eq!(scores, vec![30, 20, 10]);

        let latest = service.user_games(3, Some(1)).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].score, 30);
    }

    #[tokio::test]
    async fn totals_count_users_and_games() {
        let (service, _) = file_service().await;

        service.save_result(&request(1, "a", 10, 1)).await.unwrap();
        service.save_result(&request(1, "a", 20, 2)).await.unwrap();
        service.save_result(&request(2, "b", 30, 3)).await.unwrap();

        assert_eq!(
            service.totals().await.unwrap(),
            TotalStats {
                total_users: 2,
                total_games: 3,
            }
        );
        assert!(service.health_check().await.is_ok());
        assert_eq!(service.backend(), "file");
    }

    #[tokio::test]
    async fn refresh_updates_changed_names_only() {
        let (service, store) = file_service().await;

        service.save_result(&request(1, "User_1", 10, 1)).await.unwrap();
        service.save_result(&request(2, "bob", 10, 1)).await.unwrap();
        service.save_result(&request(3, "User_3", 10, 1)).await.unwrap();

        let lookup = FakeLookup(HashMap::from([
            (1, "alice".to_string()),
            (2, "bob".to_string()),
        ]));
        let report = service
            .refresh_usernames(&lookup, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(report.total_found, 3);
        assert_eq!(report.updated, 1);
        assert_eq!(store.find_user(1).await.unwrap().unwrap().username, "alice");
        assert_eq!(store.find_user(3).await.unwrap().unwrap().username, "User_3");
        assert_eq!(store.find_user(1).await.unwrap().unwrap().total_games, 1);
    }

    #[tokio::test]
    async fn file_store_survives_a_restart() {
        let (service, store) = file_service().await;
        service.save_result(&request(1, "alice", 60, 6)).await.unwrap();
        service.save_result(&request(2, "bob", 20, 2)).await.unwrap();

        let reopened = Arc::new(FileStore::new(store.dir()));
        reopened.init().await.unwrap();
        let service = StatsService::new(reopened, 10);

        assert_eq!(service.user_stats(1).await.unwrap().best_score, 60);
        assert_eq!(service.totals().await.unwrap().total_games, 2);

        let record = service.save_result(&request(2, "bob", 30, 3)).await.unwrap();
        assert_eq!(record.id, 3);
    }

    #[tokio::test]
    async fn result_service_acknowledges_saves() {
        let (service, _) = file_service().await;
        let payload = SubmissionPayload {
            user_id: 11,
            username: "carol".into(),
            score: 80,
            correct_answers: 8,
            wrong_answers: 2,
            total_questions: 10,
            hints_used: 1,
        };

        let ack = ResultService::save_result(&service, &payload).await.unwrap();
        assert!(ack.success);
        assert_eq!(ack.message.as_deref(), Some("Result saved successfully"));
        assert_eq!(ack.data.unwrap()["score"], 80);

        let invalid = SubmissionPayload { score: 500, ..payload };
        let ack = ResultService::save_result(&service, &invalid).await.unwrap();
        assert!(!ack.success);
        assert!(ack.error.unwrap().contains("exceeds"));

        assert_eq!(service.user_stats(11).await.unwrap().total_games, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_keep_every_game_in_the_totals() {
        let (service, _) = file_service().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.save_result(&request(42, "racer", 10 * i, i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = service.user_stats(42).await.unwrap();
        assert_eq!(service.totals().await.unwrap().total_games, 8);
        assert_eq!(stats.total_games, 8);
        assert_eq!(stats.total_score, (0..8).map(|i| 10 * i).sum::<i64>());
        assert_eq!(stats.best_score, 70);
        assert_eq!(stats.correct_answers, (0..8).sum::<i64>());
    }

    #[tokio::test]
    async fn applying_a_game_to_an_unknown_user_fails() {
        let (_, store) = file_service().await;
        let game = NewGame {
            user_id: 5,
            score: 10,
            correct_answers: 1,
            wrong_answers: 0,
            total_questions: 1,
        };

        let result = store.apply_game(&game).await;

        assert!(matches!(result, Err(StoreError::UnknownUser(5))));
    }

    #[tokio::test]
    async fn overflowing_counters_are_rejected() {
        let (service, store) = file_service().await;

        let cases = [
            SaveResultRequest {
                correct_answers: i64::MAX,
                wrong_answers: 1,
                ..request(1, "a", 10, 1)
            },
            SaveResultRequest {
                correct_answers: i64::MAX,
                wrong_answers: 0,
                total_questions: 0,
                score: i64::MAX,
                ..request(1, "a", 10, 1)
            },
            SaveResultRequest {
                correct_answers: 0,
                wrong_answers: 0,
                total_questions: i64::MAX,
                score: i64::MAX,
                ..request(1, "a", 10, 1)
            },
            SaveResultRequest {
                correct_answers: MAX_QUESTIONS_PER_GAME + 1,
                wrong_answers: 0,
                total_questions: 0,
                score: 0,
                ..request(1, "a", 10, 1)
            },
        ];

        for case in cases {
            let result = service.save_result(&case).await;
            assert!(matches!(result, Err(StatsError::Validation(_))), "{:?}", case);
        }

        assert_eq!(store.totals().await.unwrap(), TotalStats::default());
    }

    #[tokio::test]
    async fn largest_allowed_game_is_accepted() {
        let (service, _) = file_service().await;

        let req = SaveResultRequest {
            score: 10 * MAX_QUESTIONS_PER_GAME,
            correct_answers: MAX_QUESTIONS_PER_GAME,
            wrong_answers: 0,
            total_questions: MAX_QUESTIONS_PER_GAME,
            ..request(8, "marathon", 0, 0)
        };
        service.save_result(&req).await.unwrap();

        assert_eq!(service.user_stats(8).await.unwrap().best_score, 10_000);
    }
}
