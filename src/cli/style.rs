//! Terminal styling helpers

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream};
use std::fmt::Display;

/// Check mark used in success lines
pub const CHECK: &str = "✓";

/// Cross used in failure lines
pub const CROSS: &str = "✗";

/// Semantic styling for anything printable, honoring `NO_COLOR` and TTY detection
pub trait Stylize: Display {
    /// De-emphasized text
    fn muted(&self) -> String {
        format!(
            "{}",
            self.if_supports_color(Stream::Stdout, |t| t.dimmed())
        )
    }

    /// Headings and labels
    fn emphasis(&self) -> String {
        format!("{}", self.if_supports_color(Stream::Stdout, |t| t.bold()))
    }

    /// Names and values the eye should land on
    fn accent(&self) -> String {
        format!("{}", self.if_supports_color(Stream::Stdout, |t| t.cyan()))
    }

    /// Successful results
    fn success(&self) -> String {
        format!("{}", self.if_supports_color(Stream::Stdout, |t| t.green()))
    }

    /// Warnings and failures
    fn warn(&self) -> String {
        format!("{}", self.if_supports_color(Stream::Stdout, |t| t.yellow()))
    }

    /// Hard errors
    fn error(&self) -> String {
        format!("{}", self.if_supports_color(Stream::Stdout, |t| t.red()))
    }
}

impl<T: Display + ?Sized> Stylize for T {}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Red cross
pub fn cross() -> String {
    CROSS.error()
}

/// Dimmed arrow for list items
pub fn arrow() -> String {
    "→".muted()
}

/// Spinner style shared by all commands
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// Render `url` as a clickable link when the terminal supports it
pub fn hyperlink(text: &str, url: &str) -> String {
    if supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        terminal_link::Link::new(text, url).to_string()
    } else {
        url.to_string()
    }
}
