//! # Output
//!
//! This module provides the output sink the clone pipeline reports progress
//! to, and the utilities controlling how that output looks on a terminal.
//! Output is informational only: nothing in the pipeline depends on it.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::cell::RefCell;
use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Receives human-readable progress lines from the clone pipeline.
pub trait ProgressSink {
    /// A pipeline step is starting.
    fn progress(&self, message: &str);

    /// The clone finished successfully.
    fn success(&self, message: &str);

    /// Something went wrong.
    fn error(&self, message: &str);
}

/// Prints progress to stdout and errors to stderr.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    config: OutputConfig,
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(config: OutputConfig, quiet: bool) -> Self {
        Self { config, quiet }
    }

    fn paint(&self, text: &str, kind: Line) -> String {
        if !self.config.use_color {
            return text.to_string();
        }
        match kind {
            Line::Progress => style(text).force_styling(true).yellow().to_string(),
            Line::Success => style(text).force_styling(true).green().to_string(),
            Line::Error => style(text).force_styling(true).red().bold().to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum Line {
    Progress,
    Success,
    Error,
}

impl ProgressSink for ConsoleSink {
    fn progress(&self, message: &str) {
        if !self.quiet {
            println!(
                "{} {}",
                emoji(&self.config, "📋", "[..]"),
                self.paint(message, Line::Progress)
            );
        }
    }

    fn success(&self, message: &str) {
        if !self.quiet {
            println!(
                "{} {}",
                emoji(&self.config, "✅", "[OK]"),
                self.paint(message, Line::Success)
            );
        }
    }

    fn error(&self, message: &str) {
        eprintln!(
            "{} {}",
            emoji(&self.config, "❌", "[ERROR]"),
            self.paint(message, Line::Error)
        );
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Keeps every line in memory, prefixed with its level.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: RefCell<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines received so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    fn push(&self, level: &str, message: &str) {
        self.lines.borrow_mut().push(format!("{}: {}", level, message));
    }
}

impl ProgressSink for MemorySink {
    fn progress(&self, message: &str) {
        self.push("progress", message);
    }

    fn success(&self, message: &str) {
        self.push("success", message);
    }

    fn error(&self, message: &str) {
        self.push("error", message);
    }
}
