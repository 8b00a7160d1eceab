//! Visual theme and styling.

use console::Style;

/// Styles for diagnostic output on stderr.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Style for error titles (red bold).
    pub error: Style,
    /// Style for warning titles (orange).
    pub warning: Style,
    /// Style for the `=` delimiter lines (dim).
    pub border: Style,
    /// Style for remediation hints (magenta).
    pub hint: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    /// Create the default theme.
    pub fn new() -> Self {
        Self {
            error: Style::new().red().bold().for_stderr(),
            warning: Style::new().color256(208).for_stderr(),
            border: Style::new().dim().for_stderr(),
            hint: Style::new().magenta().for_stderr(),
        }
    }

    /// Create a theme without colors (for non-TTY or `NO_COLOR`).
    pub fn plain() -> Self {
        Self {
            error: Style::new(),
            warning: Style::new(),
            border: Style::new(),
            hint: Style::new(),
        }
    }

    /// Pick [`Theme::new`] or [`Theme::plain`] for the current stderr.
    pub fn for_stderr() -> Self {
        if should_use_colors() {
            Self::new()
        } else {
            Self::plain()
        }
    }
}

/// Check if colors should be used on stderr.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::Term::stderr().is_term()
}
