//! JSON config override tool.
//!
//! Loads a training config, applies `KEY:VALUE` overrides to keys that
//! already exist, writes a timestamped copy and runs the training script
//! on it. There is no retry or recovery here: the script's exit code is the
//! result.
//!
//! # Example
//!
//! ```
//! use launchprep::overrides::{apply_override, OverrideOutcome};
//! use serde_json::json;
//!
//! let mut doc = json!({"network": {"rank": 16}}).as_object().unwrap().clone();
//! let outcome = apply_override(&mut doc, "network.rank:32");
//! assert!(matches!(outcome, OverrideOutcome::Applied { .. }));
//! assert_eq!(doc["network"]["rank"], json!(32));
//! ```

pub mod apply;
pub mod value;

pub use apply::{
    apply_override, apply_overrides, load_document, temp_config_path, write_document, Document,
    OverrideJob, OverrideOutcome,
};
pub use value::parse_override_value;
