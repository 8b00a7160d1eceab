//! Delimited diagnostic blocks.
//!
//! Problems the user has to act on (fatal errors, an unsupported
//! interpreter) are printed as a block fenced by `=` lines so they stand out
//! from streamed pip and git output:
//!
//! ```text
//! =================================================
//! INCOMPATIBLE PYTHON VERSION
//!
//! This program is tested with 3.10.6 Python, ...
//! =================================================
//! ```

use crate::error::ProvisionError;
use crate::ui::theme::Theme;

const RULE_WIDTH: usize = 49;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A titled block of text with an optional remediation hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub title: String,
    pub body: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: title.into(),
            body: body.into(),
            hint: None,
        }
    }

    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            title: title.into(),
            body: body.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Block for a fatal error, carrying the error's own hint.
    pub fn from_error(error: &ProvisionError) -> Self {
        let diagnostic = Self::error("Error", error.to_string());
        match error.hint() {
            Some(hint) => diagnostic.with_hint(hint),
            None => diagnostic,
        }
    }

    /// Render with `theme`; use [`Theme::plain`] for unstyled text.
    pub fn render(&self, theme: &Theme) -> String {
        let rule = theme.border.apply_to("=".repeat(RULE_WIDTH)).to_string();
        let title_style = match self.severity {
            Severity::Error => &theme.error,
            Severity::Warning => &theme.warning,
        };

        let mut lines = vec![rule.clone(), title_style.apply_to(&self.title).to_string()];
        if !self.body.is_empty() {
            lines.push(String::new());
            lines.push(self.body.trim_end().to_string());
        }
        if let Some(hint) = &self.hint {
            lines.push(String::new());
            lines.push(theme.hint.apply_to(format!("hint: {hint}")).to_string());
        }
        lines.push(rule);
        lines.join("\n")
    }

    /// Print to stderr, styled when stderr is a terminal.
    pub fn eprint(&self) {
        eprintln!("{}", self.render(&Theme::for_stderr()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_fenced_by_rules() {
        let text = Diagnostic::warning("INCOMPATIBLE PYTHON VERSION", "details here")
            .render(&Theme::plain());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first().unwrap(), &"=".repeat(RULE_WIDTH));
        assert_eq!(lines.last().unwrap(), &"=".repeat(RULE_WIDTH));
        assert_eq!(lines[1], "INCOMPATIBLE PYTHON VERSION");
        assert!(text.contains("details here"));
    }

    #[test]
    fn plain_layout_separates_sections_with_blank_lines() {
        let text = Diagnostic::error("Error", "clone failed\n")
            .with_hint("check the URL")
            .render(&Theme::plain());
        let rule = "=".repeat(RULE_WIDTH);
        assert_eq!(
            text,
            format!("{rule}\nError\n\nclone failed\n\nhint: check the URL\n{rule}")
        );
    }

    #[test]
    fn error_block_includes_hint() {
        let error = ProvisionError::CapabilityUnavailable {
            capability: "CUDA".into(),
            remediation: "install another torch build".into(),
        };
        let text = Diagnostic::from_error(&error).render(&Theme::plain());
        assert!(text.contains("CUDA is not available"));
        assert!(text.contains("hint: Pass --skip-torch-cuda-test"));
    }

    #[test]
    fn empty_body_has_no_blank_gap() {
        let text = Diagnostic::error("Boom", "").render(&Theme::plain());
        assert_eq!(text.lines().count(), 3);
    }
}
