//! Terminal output.
//!
//! Progress goes through `tracing`; this module only renders the
//! delimited [`Diagnostic`] blocks that ask the user to do something.
//!
//! # Example
//!
//! ```
//! use launchprep::ui::{Diagnostic, Theme};
//!
//! let block = Diagnostic::warning("Heads up", "Something needs attention.")
//!     .with_hint("Run again with --debug.");
//! let text = block.render(&Theme::plain());
//! assert!(text.starts_with("====="));
//! assert!(text.contains("hint: Run again with --debug."));
//! ```

pub mod diagnostic;
pub mod theme;

pub use diagnostic::{Diagnostic, Severity};
pub use theme::{should_use_colors, Theme};
