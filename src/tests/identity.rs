#[cfg(test)]
mod tests {
    use crate::identity::{
        host::resolve_identity,
        models::{HostContext, HostUser, PlayerIdentity, display_name, placeholder_name},
    };

    fn fallback() -> PlayerIdentity {
        PlayerIdentity::new(123456789, "Test User")
    }

    fn context(id: Option<i64>, username: Option<&str>, first_name: Option<&str>) -> HostContext {
        HostContext {
            user: Some(HostUser {
                id,
                username: username.map(String::from),
                first_name: first_name.map(String::from),
            }),
        }
    }

    #[test]
    fn username_wins_over_first_name() {
        let ctx = context(Some(42), Some("quizmaster"), Some("Anna"));
        let identity = resolve_identity(Some(&ctx), &fallback());

        assert_eq!(identity, PlayerIdentity::new(42, "quizmaster"));
    }

    #[test]
    fn first_name_is_used_without_username() {
        let ctx = context(Some(42), None, Some("Anna"));
        assert_eq!(resolve_identity(Some(&ctx), &fallback()).username, "Anna");

        let ctx = context(Some(42), Some("   "), Some("Anna"));
        assert_eq!(resolve_identity(Some(&ctx), &fallback()).username, "Anna");
    }

    #[test]
    fn placeholder_is_used_without_any_name() {
        let ctx = context(Some(42), None, Some(""));
        let identity = resolve_identity(Some(&ctx), &fallback());

        assert_eq!(identity, PlayerIdentity::new(42, "User_42"));
        assert_eq!(placeholder_name(42), "User_42");
    }

    #[test]
    fn missing_host_falls_back() {
        assert_eq!(resolve_identity(None, &fallback()), fallback());

        let empty = HostContext::default();
        assert_eq!(resolve_identity(Some(&empty), &fallback()), fallback());
    }

    #[test]
    fn invalid_user_id_falls_back() {
        for id in [None, Some(0), Some(-5)] {
            let ctx = context(id, Some("ghost"), None);
            assert_eq!(resolve_identity(Some(&ctx), &fallback()), fallback());
        }
    }

    #[test]
    fn display_name_trims_names() {
        assert_eq!(display_name(7, Some("  bob "), None), "bob");
        assert_eq!(display_name(7, None, Some(" Bob")), "Bob");
        assert_eq!(display_name(7, None, None), "User_7");
    }

    #[test]
    fn host_context_parses_init_data() {
        let raw = r#"{
            "query_id": "AAH",
            "user": {
                "id": 987654321,
                "first_name": "Anna",
                "last_name": "K",
                "username": "anna_k",
                "language_code": "en"
            },
            "auth_date": "1700000000"
        }"#;

        let ctx: HostContext = serde_json::from_str(raw).unwrap();
        let identity = resolve_identity(Some(&ctx), &fallback());

        assert_eq!(identity, PlayerIdentity::new(987654321, "anna_k"));
    }

    #[test]
    fn host_context_without_user_parses() {
        let ctx: HostContext = serde_json::from_str("{}").unwrap();
        assert!(ctx.user.is_none());
    }
}
