pub mod deps;
pub mod doctor;
pub mod imports;
pub mod memory;
pub mod stats;
pub mod tools;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Stderr spinner for long batch operations.
pub(crate) fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Shorten to `max` characters, appending `...` when cut.
pub(crate) fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}
