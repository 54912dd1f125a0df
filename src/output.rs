//! # Output Configuration
//!
//! Decides whether the summary lines printed to stdout, and the log lines
//! written to stderr, use color and emoji.
//!
//! The `--color` flag wins when it is `always` or `never`. In `auto` mode the
//! usual conventions apply:
//! - `NO_COLOR` set to anything disables color (https://no-color.org/)
//! - `CLICOLOR=0` disables color
//! - `CLICOLOR_FORCE=1` forces color even when stdout is not a TTY
//! - `TERM=dumb` disables color

use std::env;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
    /// Whether summary lines are suppressed.
    pub quiet: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flags.
    pub fn from_env_and_flag(color_flag: &str, quiet: bool) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color, quiet }
    }

    fn detect_color_support() -> bool {
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

    /// Prints a summary line to stdout unless quiet.
    pub fn summary(&self, emoji_str: &str, plain: &str, message: &str) {
        if !self.quiet {
            println!("{} {}", emoji(self, emoji_str, plain), message);
        }
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self {
            use_color: true,
            quiet: false,
        }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self {
            use_color: false,
            quiet: false,
        }
    }
}

/// Returns the emoji when colors are enabled, the plain marker otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
