use tracing::{debug, warn};

use crate::identity::models::{HostContext, HostUser, PlayerIdentity, display_name};

pub fn resolve_identity(context: Option<&HostContext>, fallback: &PlayerIdentity) -> PlayerIdentity {
    let Some(user) = context.and_then(|c| c.user.as_ref()) else {
        debug!("No host user available, using fallback identity");
        return fallback.clone();
    };

    resolve_user(user).unwrap_or_else(|| {
        warn!("Host user is missing a valid id, using fallback identity");
        fallback.clone()
    })
}

fn resolve_user(user: &HostUser) -> Option<PlayerIdentity> {
    let user_id = user.id.filter(|id| *id > 0)?;
    let username = display_name(
        user_id,
        user.username.as_deref(),
        user.first_name.as_deref(),
    );

    Some(PlayerIdentity::new(user_id, username))
}

pub fn resolve_telegram_user(
    user: Option<&teloxide::types::User>,
    fallback: &PlayerIdentity,
) -> PlayerIdentity {
    let context = user.map(|u| HostContext {
        user: Some(HostUser::from(u)),
    });

    resolve_identity(context.as_ref(), fallback)
}
