//! Terminal color support detection and formatting.
//!
//! Colors are disabled when `NO_COLOR` is set or output is not a terminal.

use std::env;
use std::io::{self, IsTerminal};

/// Color support detection and formatting
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    /// Detect color support automatically
    pub fn detect() -> Self {
        Self {
            enabled: Self::should_use_colors(),
        }
    }

    /// Force disable colors
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn should_use_colors() -> bool {
        if env::var("NO_COLOR").is_ok() {
            return false;
        }
        io::stderr().is_terminal() && io::stdout().is_terminal()
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    /// Format text as dim/gray
    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }
}
