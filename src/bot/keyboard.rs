use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, WebAppInfo,
};
use url::Url;

use crate::{bot::game::CallbackAction, quiz::models::Presentation};

pub const PLAY: &str = "🎮 Play";
pub const MY_STATS: &str = "📊 My stats";
pub const LEADERBOARD: &str = "🏆 Leaderboard";
pub const INFO: &str = "ℹ️ Info";

const LETTERS: [&str; 4] = ["A", "B", "C", "D"];

pub(crate) fn main_menu_keyboard() -> KeyboardMarkup {
    let keyboard = vec![
        vec![KeyboardButton::new(PLAY)],
        vec![KeyboardButton::new(MY_STATS), KeyboardButton::new(LEADERBOARD)],
        vec![KeyboardButton::new(INFO)],
    ];

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn play_keyboard(webapp_url: Option<&Url>) -> InlineKeyboardMarkup {
    let mut keyboard = Vec::new();

    if let Some(url) = webapp_url {
        keyboard.push(vec![InlineKeyboardButton::web_app(
            "🌐 Open the quiz app",
            WebAppInfo { url: url.clone() },
        )]);
    }

    keyboard.push(vec![InlineKeyboardButton::callback(
        "▶️ Play here",
        CallbackAction::Play.to_string(),
    )]);

    InlineKeyboardMarkup::new(keyboard)
}

/// One button per answer still on screen, plus the hint button while a hint
/// can still hide something.
pub(crate) fn question_keyboard(
    presentation: &Presentation,
    hints_remaining: u32,
) -> InlineKeyboardMarkup {
    let question_no = presentation.question_no;
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = presentation
        .visible_positions()
        .into_iter()
        .map(|position| {
            vec![InlineKeyboardButton::callback(
                format!("{}. {}", LETTERS[position], presentation.answers[position]),
                CallbackAction::Answer {
                    question_no,
                    position,
                }
                .to_string(),
            )]
        })
        .collect();

    if hints_remaining > 0 && !presentation.hideable_positions().is_empty() {
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!("💡 Hint ({} left)", hints_remaining),
            CallbackAction::Hint { question_no }.to_string(),
        )]);
    }

    InlineKeyboardMarkup::new(keyboard)
}

pub(crate) fn result_keyboard(can_save: bool) -> InlineKeyboardMarkup {
    let mut row = Vec::new();
    if can_save {
        row.push(InlineKeyboardButton::callback(
            "💾 Save result",
            CallbackAction::Save.to_string(),
        ));
    }
    row.push(InlineKeyboardButton::callback(
        "🔁 Play again",
        CallbackAction::Again.to_string(),
    ));

    InlineKeyboardMarkup::new(vec![row])
}
