use serde::{Deserialize, Serialize};

/// Who played a session. Resolved once per session and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub user_id: i64,
    pub username: String,
}

impl PlayerIdentity {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// The `initDataUnsafe` object a Telegram Web App exposes to the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostContext {
    pub user: Option<HostUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl From<&teloxide::types::User> for HostUser {
    fn from(user: &teloxide::types::User) -> Self {
        Self {
            id: i64::try_from(user.id.0).ok(),
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
        }
    }
}

/// Picks the name shown on leaderboards: the Telegram handle, then the first
/// name, then a placeholder built from the id.
pub fn display_name(user_id: i64, username: Option<&str>, first_name: Option<&str>) -> String {
    fn non_blank(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    non_blank(username)
        .or_else(|| non_blank(first_name))
        .map(String::from)
        .unwrap_or_else(|| placeholder_name(user_id))
}

pub fn placeholder_name(user_id: i64) -> String {
    format!("User_{}", user_id)
}
