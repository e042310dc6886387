use std::{error::Error, net::SocketAddr, sync::Arc};

use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    update_listeners::webhooks::{self, Options},
    utils::command::BotCommands,
};
use tracing::{error, info, warn};
use url::Url;

use crate::{
    bot::{commands::Command, game::GameRegistry},
    config::config::{BotConfig, GameConfig},
    identity::models::PlayerIdentity,
    quiz::models::QuestionBank,
    stats::service::StatsService,
    submission::submitter::ResultService,
};

pub mod commands;
pub mod game;
pub mod handlers;
pub mod keyboard;
pub mod render;

pub(crate) type HandlerResult = Result<(), Box<dyn Error + Send + Sync + 'static>>;

/// Everything the bot's handlers share, injected through dptree.
pub struct BotContext {
    pub bank: QuestionBank,
    pub games: GameRegistry,
    pub stats: StatsService,
    pub results: Arc<dyn ResultService>,
    pub game_config: GameConfig,
    pub fallback_identity: PlayerIdentity,
    pub webapp_url: Option<Url>,
}

fn schema() -> UpdateHandler<Box<dyn Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(commands::start))
        .branch(case![Command::Help].endpoint(commands::help))
        .branch(case![Command::Stats].endpoint(commands::stats))
        .branch(case![Command::Top].endpoint(commands::top));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .endpoint(handlers::menu);

    let callback_handler = Update::filter_callback_query().endpoint(handlers::callback);

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}

fn webhook_options(config: &BotConfig) -> Option<(SocketAddr, Url)> {
    let (Some(url), Some(addr)) = (&config.webhook_url, &config.webhook_addr) else {
        return None;
    };

    match (url.parse::<Url>(), addr.parse::<SocketAddr>()) {
        (Ok(url), Ok(addr)) => Some((addr, url)),
        (url, addr) => {
            warn!(
                "Ignoring webhook settings (url ok: {}, addr ok: {}), falling back to polling",
                url.is_ok(),
                addr.is_ok()
            );
            None
        }
    }
}

/// Runs the bot until the process stops. Uses a webhook when one is
/// configured, long polling otherwise.
pub async fn run(config: BotConfig, ctx: Arc<BotContext>) {
    let bot = Bot::new(&config.token);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build();

    match webhook_options(&config) {
        Some((addr, url)) => {
            info!("Starting bot with webhook {} on {}", url, addr);
            match webhooks::axum(bot, Options::new(addr, url)).await {
                Ok(listener) => {
                    dispatcher
                        .dispatch_with_listener(
                            listener,
                            LoggingErrorHandler::with_custom_text(
                                "An error from the update listener",
                            ),
                        )
                        .await
                }
                Err(e) => error!("Failed to set up the bot webhook: {}", e),
            }
        }
        None => {
            info!("Starting bot with long polling");
            dispatcher.dispatch().await
        }
    }
}
