use covidash_core::models::FatalityLevel;
use covidash_core::search::Accent;
use ratatui::style::{Color, Modifier, Style};

// Color palette
pub const PRIMARY: Color = Color::Rgb(64, 128, 192);
pub const SECONDARY: Color = Color::Rgb(96, 160, 96);
pub const ACCENT: Color = Color::Rgb(192, 160, 64);
pub const ERROR: Color = Color::Rgb(192, 64, 64);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const HIGHLIGHT: Color = Color::Rgb(48, 48, 64);

pub fn accent_color(accent: Accent) -> Color {
    match accent {
        Accent::Primary => PRIMARY,
        Accent::Secondary => SECONDARY,
    }
}

// Styles
pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

/// Border of a combobox: its accent while open, muted otherwise.
pub fn border_style(accent: Accent, focused: bool) -> Style {
    if focused {
        Style::default().fg(accent_color(accent))
    } else {
        Style::default().fg(MUTED)
    }
}

/// The chip showing a picked country or location.
pub fn badge_style(accent: Accent) -> Style {
    Style::default()
        .fg(accent_color(accent))
        .add_modifier(Modifier::BOLD)
}

pub fn search_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn fatality_style(level: FatalityLevel) -> Style {
    let color = match level {
        FatalityLevel::Low => SECONDARY,
        FatalityLevel::Medium => ACCENT,
        FatalityLevel::High => ERROR,
    };
    Style::default().fg(color)
}

/// Positive daily changes in cases are bad news.
pub fn diff_style(diff: i64) -> Style {
    if diff > 0 {
        Style::default().fg(ERROR)
    } else {
        muted_style()
    }
}
