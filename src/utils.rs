use chrono::{DateTime, Local};
use ratatui::style::Color;
use std::hash::{Hash, Hasher};

/// Pick a stable color for a string (context names in the watch view).
pub fn get_color(s: &str) -> Color {
    let colors = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::LightRed,
        Color::LightGreen,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightMagenta,
        Color::LightCyan,
    ];
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    let hash = hasher.finish() as u32;
    colors[(hash % colors.len() as u32) as usize]
}

/// Human readable time since `then`, e.g. "4s ago".
pub fn format_since(then: DateTime<Local>, now: DateTime<Local>) -> String {
    let total_secs = now.signed_duration_since(then).num_seconds().max(0);
    if total_secs < 60 {
        format!("{}s ago", total_secs)
    } else if total_secs < 3600 {
        format!("{}m ago", total_secs / 60)
    } else if total_secs < 86400 {
        format!("{}h ago", total_secs / 3600)
    } else {
        format!("{}d ago", total_secs / 86400)
    }
}
