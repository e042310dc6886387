use std::{sync::Arc, time::Duration};

use teloxide::{
    Bot,
    payloads::{AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters},
    prelude::Requester,
    types::{CallbackQuery, ChatId, Message, MessageId, User},
};
use tracing::{debug, error, info, warn};

use crate::{
    bot::{
        BotContext, HandlerResult,
        game::{CallbackAction, SharedGame},
        keyboard::{
            INFO, LEADERBOARD, MY_STATS, PLAY, main_menu_keyboard, play_keyboard,
            question_keyboard, result_keyboard,
        },
        render::{
            INTERRUPTED_TEXT, UNKNOWN_TEXT, hint_notice, info_text, leaderboard_text,
            question_text, result_text, reveal_text, stats_text, submit_text,
        },
    },
    identity::host::resolve_telegram_user,
    quiz::{error::SessionError, session::Tick, timer::TimerHandle},
    submission::{error::SubmitError, models::SubmissionPayload},
};

/// Reply keyboard presses and free text.
pub(crate) async fn menu(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    match msg.text() {
        Some(PLAY) => {
            bot.send_message(msg.chat.id, "Choose how you want to play:")
                .reply_markup(play_keyboard(ctx.webapp_url.as_ref()))
                .await?;
        }
        Some(MY_STATS) => send_stats(&bot, &msg, &ctx).await?,
        Some(LEADERBOARD) => send_leaderboard(&bot, &msg, &ctx).await?,
        Some(INFO) => {
            bot.send_message(msg.chat.id, info_text(&ctx.game_config))
                .reply_markup(main_menu_keyboard())
                .await?;
        }
        other => {
            debug!("Unhandled message {:?} in chat {}", other, msg.chat.id);
            bot.send_message(msg.chat.id, UNKNOWN_TEXT)
                .reply_markup(main_menu_keyboard())
                .await?;
        }
    }

    Ok(())
}

pub(crate) async fn send_stats(bot: &Bot, msg: &Message, ctx: &BotContext) -> HandlerResult {
    let identity = resolve_telegram_user(msg.from.as_ref(), &ctx.fallback_identity);
    let text = match ctx.stats.user_stats(identity.user_id).await {
        Ok(stats) => stats_text(&stats),
        Err(e) => {
            error!("Failed to load stats of {}: {}", identity.user_id, e);
            "⚠️ Stats are unavailable right now, try again later.".to_string()
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub(crate) async fn send_leaderboard(bot: &Bot, msg: &Message, ctx: &BotContext) -> HandlerResult {
    let text = match ctx.stats.leaderboard(None).await {
        Ok(entries) => leaderboard_text(&entries),
        Err(e) => {
            error!("Failed to load leaderboard: {}", e);
            "⚠️ The leaderboard is unavailable right now, try again later.".to_string()
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Inline button presses.
pub(crate) async fn callback(bot: Bot, q: CallbackQuery, ctx: Arc<BotContext>) -> HandlerResult {
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let action = match q.data.as_deref().map(str::parse::<CallbackAction>) {
        Some(Ok(action)) => action,
        Some(Err(e)) => {
            warn!("{}", e);
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
        None => {
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };
    debug!("Chat {} pressed {}", chat_id, action);

    let notice = match action {
        CallbackAction::Play | CallbackAction::Again => {
            start_game(&bot, &ctx, chat_id, &q.from).await?
        }
        CallbackAction::Answer {
            question_no,
            position,
        } => answer(&bot, &ctx, chat_id, message_id, question_no, position).await?,
        CallbackAction::Hint { question_no } => {
            hint(&bot, &ctx, chat_id, message_id, question_no).await?
        }
        CallbackAction::Save => save(&bot, &ctx, chat_id).await?,
    };

    let mut request = bot.answer_callback_query(q.id.clone());
    if let Some(text) = notice {
        request = request.text(text);
    }
    request.await?;

    Ok(())
}

fn session_notice(e: &SessionError) -> String {
    match e {
        SessionError::StaleQuestion { .. } | SessionError::InvalidTransition { .. } => {
            "This question is already closed".to_string()
        }
        other => other.to_string(),
    }
}

async fn start_game(
    bot: &Bot,
    ctx: &Arc<BotContext>,
    chat_id: ChatId,
    user: &User,
) -> Result<Option<String>, teloxide::RequestError> {
    let identity = resolve_telegram_user(Some(user), &ctx.fallback_identity);
    let shared = ctx.games.get_or_create(chat_id, &ctx.game_config);
    let mut game = shared.lock().await;

    if let Err(e) = game.restart(&ctx.bank, identity) {
        error!("Failed to start a game in chat {}: {}", chat_id, e);
        return Ok(Some(e.to_string()));
    }

    let Some(presentation) = game.session.presentation() else {
        return Ok(None);
    };
    let text = question_text(
        presentation,
        game.session.total_questions(),
        game.session.remaining_seconds(),
        game.session.hints_remaining(),
    );
    let keyboard = question_keyboard(presentation, game.session.hints_remaining());
    info!("Chat {} started round {}", chat_id, game.round);

    let sent = match bot.send_message(chat_id, text).reply_markup(keyboard).await {
        Ok(sent) => sent,
        Err(e) => {
            error!("Failed to send the first question to chat {}: {}", chat_id, e);
            game.abandon();
            return Ok(Some(INTERRUPTED_TEXT.to_string()));
        }
    };
    let question_no = game.session.current_index();
    let handle = TimerHandle::spawn(run_countdown(
        bot.clone(),
        ctx.clone(),
        shared.clone(),
        chat_id,
        sent.id,
        game.round,
        question_no,
    ));
    game.session.attach_timer(handle);

    Ok(None)
}

async fn answer(
    bot: &Bot,
    ctx: &Arc<BotContext>,
    chat_id: ChatId,
    message_id: MessageId,
    question_no: usize,
    position: usize,
) -> Result<Option<String>, teloxide::RequestError> {
    let Some(shared) = ctx.games.get(chat_id) else {
        return Ok(Some("Start a new game first".into()));
    };

    let (text, round, correct) = {
        let mut game = shared.lock().await;
        let outcome = match game.session.answer(question_no, position) {
            Ok(outcome) => outcome,
            Err(e) => return Ok(Some(session_notice(&e))),
        };

        let Some(presentation) = game.session.presentation() else {
            return Ok(None);
        };
        let text = reveal_text(presentation, &outcome, game.session.total_questions());
        (text, game.round, outcome.is_correct())
    };

    schedule_advance(bot, ctx, shared, chat_id, round, question_no);
    bot.edit_message_text(chat_id, message_id, text).await?;

    let notice = if correct { "✅ Correct!" } else { "❌ Wrong" };
    Ok(Some(notice.to_string()))
}

async fn hint(
    bot: &Bot,
    ctx: &Arc<BotContext>,
    chat_id: ChatId,
    message_id: MessageId,
    question_no: usize,
) -> Result<Option<String>, teloxide::RequestError> {
    let Some(shared) = ctx.games.get(chat_id) else {
        return Ok(Some("Start a new game first".into()));
    };

    let mut game = shared.lock().await;
    let hidden = match game.session.use_hint(question_no) {
        Ok(hidden) => hidden,
        Err(e) => return Ok(Some(session_notice(&e))),
    };

    let Some(presentation) = game.session.presentation() else {
        return Ok(None);
    };
    let hints_remaining = game.session.hints_remaining();
    let text = question_text(
        presentation,
        game.session.total_questions(),
        game.session.remaining_seconds(),
        hints_remaining,
    );
    let keyboard = question_keyboard(presentation, hints_remaining);

    bot.edit_message_text(chat_id, message_id, text)
        .reply_markup(keyboard)
        .await?;

    Ok(Some(hint_notice(hidden.len(), hints_remaining)))
}

async fn save(
    bot: &Bot,
    ctx: &Arc<BotContext>,
    chat_id: ChatId,
) -> Result<Option<String>, teloxide::RequestError> {
    let Some(shared) = ctx.games.get(chat_id) else {
        return Ok(Some("Start a new game first".into()));
    };

    let (submission, payload) = {
        let game = shared.lock().await;
        let identity = game
            .identity
            .clone()
            .unwrap_or_else(|| ctx.fallback_identity.clone());

        match SubmissionPayload::from_session(&game.session, &identity) {
            Ok(payload) => (game.submission.clone(), payload),
            Err(e) => return Ok(Some(e.to_string())),
        }
    };

    // The game lock is released here so the chat stays responsive while saving.
    let result = submission.send(ctx.results.as_ref(), &payload).await;
    let text = submit_text(&result);

    match result {
        Ok(()) | Err(SubmitError::Failed(_)) => {
            bot.send_message(chat_id, text)
                .reply_markup(result_keyboard(!submission.is_submitted()))
                .await?;
            Ok(None)
        }
        Err(_) => Ok(Some(text)),
    }
}

fn schedule_advance(
    bot: &Bot,
    ctx: &Arc<BotContext>,
    shared: SharedGame,
    chat_id: ChatId,
    round: u64,
    question_no: usize,
) {
    let bot = bot.clone();
    let ctx = ctx.clone();
    let delay = Duration::from_millis(ctx.game_config.answer_delay_ms);

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = advance(&bot, &ctx, shared, chat_id, round, question_no).await {
            error!("Failed to show the next question in chat {}: {}", chat_id, e);
        }
    });
}

async fn advance(
    bot: &Bot,
    ctx: &Arc<BotContext>,
    shared: SharedGame,
    chat_id: ChatId,
    round: u64,
    question_no: usize,
) -> Result<(), teloxide::RequestError> {
    let mut game = shared.lock().await;
    if game.round != round || game.session.current_index() != question_no + 1 {
        debug!("Skipping outdated advance in chat {}", chat_id);
        return Ok(());
    }

    let finished = match game.session.advance() {
        Ok(next) => next.is_none(),
        Err(e) => {
            debug!("Chat {} cannot advance: {}", chat_id, e);
            return Ok(());
        }
    };

    let next = match game.session.presentation() {
        Some(presentation) if !finished => Some((
            presentation.question_no,
            question_keyboard(presentation, game.session.hints_remaining()),
            question_text(
                presentation,
                game.session.total_questions(),
                game.session.remaining_seconds(),
                game.session.hints_remaining(),
            ),
        )),
        _ => None,
    };

    match next {
        Some((next_no, keyboard, text)) => {
            let sent = match bot.send_message(chat_id, text).reply_markup(keyboard).await {
                Ok(sent) => sent,
                Err(e) => {
                    game.abandon();
                    drop(game);

                    if let Err(notify) = bot
                        .send_message(chat_id, INTERRUPTED_TEXT)
                        .reply_markup(main_menu_keyboard())
                        .await
                    {
                        warn!("Failed to tell chat {} about the stop: {}", chat_id, notify);
                    }
                    return Err(e);
                }
            };
            let handle = TimerHandle::spawn(run_countdown(
                bot.clone(),
                ctx.clone(),
                shared.clone(),
                chat_id,
                sent.id,
                round,
                next_no,
            ));
            game.session.attach_timer(handle);
        }
        None => {
            let result = match game.session.finish() {
                Ok(result) => result,
                Err(e) => {
                    error!("Finished game in chat {} has no result: {}", chat_id, e);
                    return Ok(());
                }
            };
            info!(
                "Chat {} finished round {} with {} points",
                chat_id, round, result.score
            );
            let can_save = game.submission.state().can_submit();
            drop(game);

            bot.send_message(chat_id, result_text(&result))
                .reply_markup(result_keyboard(can_save))
                .await?;
        }
    }

    Ok(())
}

/// Ticks the session once a second until the question is resolved. Refreshes
/// the on-screen countdown every few seconds.
async fn run_countdown(
    bot: Bot,
    ctx: Arc<BotContext>,
    shared: SharedGame,
    chat_id: ChatId,
    message_id: MessageId,
    round: u64,
    question_no: usize,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await;

    loop {
        interval.tick().await;

        let mut game = shared.lock().await;
        if game.round != round {
            return;
        }

        let tick = game.session.tick(question_no);
        let update = match tick {
            Tick::Running { remaining } if remaining % 5 == 0 || remaining <= 3 => {
                game.session.presentation().map(|presentation| {
                    let hints_remaining = game.session.hints_remaining();
                    (
                        question_text(
                            presentation,
                            game.session.total_questions(),
                            remaining,
                            hints_remaining,
                        ),
                        Some(question_keyboard(presentation, hints_remaining)),
                    )
                })
            }
            Tick::Running { .. } => None,
            Tick::Expired(outcome) => game.session.presentation().map(|presentation| {
                (
                    reveal_text(presentation, &outcome, game.session.total_questions()),
                    None,
                )
            }),
            Tick::Stale => return,
        };
        drop(game);

        if let Some((text, keyboard)) = update {
            let mut request = bot.edit_message_text(chat_id, message_id, text);
            if let Some(keyboard) = keyboard {
                request = request.reply_markup(keyboard);
            }
            if let Err(e) = request.await {
                warn!("Failed to refresh question in chat {}: {}", chat_id, e);
            }
        }

        if matches!(tick, Tick::Expired(_)) {
            schedule_advance(&bot, &ctx, shared, chat_id, round, question_no);
            return;
        }
    }
}
