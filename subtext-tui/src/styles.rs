use ratatui::style::{Color, Modifier, Style};
use subtext_engine::ScoreLevel;

pub fn user_header() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub fn user_text() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn section() -> Style {
    Style::default()
        .fg(Color::LightGreen)
        .add_modifier(Modifier::BOLD)
}

pub fn reply_text() -> Style {
    Style::default().fg(Color::LightGreen)
}

pub fn label() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

pub fn value() -> Style {
    Style::default().fg(Color::White)
}

pub fn quote() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::ITALIC)
}

pub fn tags() -> Style {
    Style::default().fg(Color::Magenta)
}

pub fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn system() -> Style {
    Style::default().fg(Color::Gray)
}

pub fn warning() -> Style {
    Style::default().fg(Color::LightYellow)
}

pub fn error() -> Style {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
}

/// Traffic-light colour for a score band.
pub fn score(level: Option<ScoreLevel>) -> Style {
    let fg = match level {
        Some(ScoreLevel::Low) => Color::Green,
        // Closest terminal colour to amber.
        Some(ScoreLevel::Medium) => Color::Yellow,
        Some(ScoreLevel::High) => Color::Red,
        None => Color::DarkGray,
    };
    Style::default().fg(fg).add_modifier(Modifier::BOLD)
}
