use crate::{
    config::config::GameConfig,
    quiz::models::{FinalResult, Outcome, Presentation},
    stats::models::{LeaderboardEntry, UserStats},
    submission::error::SubmitError,
};

const LETTERS: [&str; 4] = ["A", "B", "C", "D"];

pub fn question_text(
    presentation: &Presentation,
    total: usize,
    remaining_seconds: u32,
    hints_remaining: u32,
) -> String {
    let mut text = format!(
        "❓ Question {}/{}\n\n{}\n",
        presentation.question_no + 1,
        total,
        presentation.prompt
    );

    for position in presentation.visible_positions() {
        text.push_str(&format!(
            "\n{}. {}",
            LETTERS[position], presentation.answers[position]
        ));
    }

    text.push_str(&format!(
        "\n\n⏱ {}s   💡 {} left",
        remaining_seconds, hints_remaining
    ));
    text
}

pub fn reveal_text(presentation: &Presentation, outcome: &Outcome, total: usize) -> String {
    let verdict = match outcome {
        Outcome::Correct { .. } => "✅ Correct!".to_string(),
        Outcome::Wrong { selected, .. } => format!(
            "❌ Wrong, you picked {}.",
            presentation.answers[*selected]
        ),
        Outcome::TimedOut { .. } => "⌛ Time is up!".to_string(),
    };

    format!(
        "Question {}/{}\n\n{}\n\n{}\nThe answer is: {}",
        presentation.question_no + 1,
        total,
        presentation.prompt,
        verdict,
        presentation.correct_answer()
    )
}

pub fn hint_notice(removed: usize, hints_remaining: u32) -> String {
    let answers = if removed == 1 { "answer" } else { "answers" };
    format!(
        "💡 {} wrong {} removed, {} hints left",
        removed, answers, hints_remaining
    )
}

pub fn result_text(result: &FinalResult) -> String {
    format!(
        "🏁 Game over!\n\n🎯 Score: {}\n✅ Correct: {}\n❌ Wrong: {}\n📈 Accuracy: {}%\n💡 Hints used: {}",
        result.score,
        result.correct_count,
        result.wrong_count,
        result.accuracy(),
        result.hints_used
    )
}

pub fn stats_text(stats: &UserStats) -> String {
    if stats.total_games == 0 {
        return "📊 You have not saved any games yet. Tap 🎮 Play to start!".to_string();
    }

    format!(
        "📊 Your stats\n\n🎮 Games: {}\n🎯 Total score: {}\n🏅 Best game: {}\n📈 Average: {:.1}\n✅ Correct: {}\n❌ Wrong: {}",
        stats.total_games,
        stats.total_score,
        stats.best_score,
        stats.average_score,
        stats.correct_answers,
        stats.wrong_answers
    )
}

pub fn leaderboard_text(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "🏆 Nobody is on the leaderboard yet.".to_string();
    }

    let mut text = String::from("🏆 Leaderboard\n");
    for (i, entry) in entries.iter().enumerate() {
        let place = match i {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            _ => format!("{}.", i + 1),
        };

        text.push_str(&format!(
            "\n{} {}: {} pts ({} games, best {})",
            place, entry.username, entry.total_score, entry.total_games, entry.best_score
        ));
    }

    text
}

pub fn submit_text(result: &Result<(), SubmitError>) -> String {
    match result {
        Ok(()) => "💾 Result saved! Check 🏆 Leaderboard to see your place.".to_string(),
        Err(SubmitError::AlreadySubmitted) => "This result is already saved.".to_string(),
        Err(SubmitError::InFlight) => "Saving, please wait…".to_string(),
        Err(SubmitError::NotFinished(_)) => "Finish the game before saving.".to_string(),
        Err(SubmitError::AnonymousPlayer) => {
            "Results can only be saved for a Telegram account.".to_string()
        }
        Err(SubmitError::Failed(reason)) => format!(
            "⚠️ Could not save the result: {}\nTap 💾 Save result to try again.",
            reason
        ),
    }
}

pub fn info_text(config: &GameConfig) -> String {
    format!(
        "ℹ️ Quiz rules\n\n• {} questions per game\n• {} seconds per question\n• {} hints per game, each removes two wrong answers\n• {} points per correct answer\n\nSave your result to get on the leaderboard!",
        config.questions_per_game,
        config.question_seconds,
        config.max_hints,
        config.points_per_correct
    )
}

pub const WELCOME_TEXT: &str = "👋 Welcome to the quiz bot!\n\nTest your knowledge, save your results and climb the leaderboard.";

pub const INTERRUPTED_TEXT: &str =
    "⚠️ The game stopped because a question could not be sent. Tap 🎮 Play to start again.";

pub const UNKNOWN_TEXT: &str = "Use the menu buttons below 👇";
