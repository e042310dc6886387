use std::sync::Arc;

use teloxide::{
    Bot, payloads::SendMessageSetters, prelude::Requester, types::Message,
    utils::command::BotCommands,
};
use tracing::info;

use crate::bot::{
    BotContext, HandlerResult,
    handlers::{send_leaderboard, send_stats},
    keyboard::main_menu_keyboard,
    render::WELCOME_TEXT,
};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show the main menu.")]
    Start,
    #[command(description = "display this text.")]
    Help,
    #[command(description = "show your stats.")]
    Stats,
    #[command(description = "show the leaderboard.")]
    Top,
}

pub(crate) async fn start(bot: Bot, msg: Message) -> HandlerResult {
    info!("Chat {} started the bot", msg.chat.id);
    bot.send_message(msg.chat.id, WELCOME_TEXT)
        .reply_markup(main_menu_keyboard())
        .await?;
    Ok(())
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

pub(crate) async fn stats(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    send_stats(&bot, &msg, &ctx).await
}

pub(crate) async fn top(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    send_leaderboard(&bot, &msg, &ctx).await
}
