//! Patch a JSON config and run the training script with the result.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde_json::{Map, Value};

use crate::error::{ProvisionError, Result};
use crate::overrides::value::parse_override_value;
use crate::shell::{CommandRunner, CommandSpec};

/// A JSON document whose root is an object.
pub type Document = Map<String, Value>;

/// Result of applying one `KEY:VALUE` item.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideOutcome {
    Applied {
        key: String,
        previous: Value,
        value: Value,
    },
    Skipped {
        item: String,
        reason: String,
    },
}

/// Load `path` and require an object at the root.
pub fn load_document(path: &Path) -> Result<Document> {
    let error = |message: String| ProvisionError::OverrideError {
        path: path.to_path_buf(),
        message,
    };
    if !path.is_file() {
        return Err(error("original JSON file not found".to_string()));
    }
    let content = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content).map_err(|e| error(format!("invalid JSON: {e}")))? {
        Value::Object(map) => Ok(map),
        other => Err(error(format!(
            "expected the JSON root to be an object, got {}",
            kind(&other)
        ))),
    }
}

/// Apply one `KEY:VALUE` item.
///
/// The key is dotted (`network.rank`). Every intermediate key must exist
/// and hold an object, and the final key must already exist; overrides
/// never add keys.
pub fn apply_override(doc: &mut Document, item: &str) -> OverrideOutcome {
    let skip = |reason: String| OverrideOutcome::Skipped {
        item: item.to_string(),
        reason,
    };

    let Some((key, raw)) = item.split_once(':') else {
        return skip("invalid format, missing ':'".to_string());
    };
    let key = key.trim();
    if key.is_empty() {
        return skip("invalid format, empty key".to_string());
    }

    let mut parts: Vec<&str> = key.split('.').collect();
    let Some(last) = parts.pop() else {
        return skip("invalid format, empty key".to_string());
    };

    let mut level = doc;
    for part in parts {
        level = match level.get_mut(part) {
            Some(Value::Object(next)) => next,
            Some(_) => {
                return skip(format!(
                    "intermediate key '{part}' in '{key}' is not an object"
                ))
            }
            None => return skip(format!("intermediate key '{part}' in '{key}' not found")),
        };
    }

    let Some(slot) = level.get_mut(last) else {
        return skip(format!("key '{key}' not found in the configuration"));
    };
    let value = parse_override_value(raw);
    let previous = std::mem::replace(slot, value.clone());
    OverrideOutcome::Applied {
        key: key.to_string(),
        previous,
        value,
    }
}

/// Apply every item in order, logging each outcome.
pub fn apply_overrides(doc: &mut Document, items: &[String]) -> Vec<OverrideOutcome> {
    let outcomes: Vec<OverrideOutcome> = items
        .iter()
        .map(|item| {
            let outcome = apply_override(doc, item);
            match &outcome {
                OverrideOutcome::Applied {
                    key,
                    previous,
                    value,
                } => tracing::info!("Overriding key '{key}': {previous} -> {value} ({})", kind(value)),
                OverrideOutcome::Skipped { item, reason } => {
                    tracing::warn!("Skipping override '{item}': {reason}")
                }
            }
            outcome
        })
        .collect();

    if !items.is_empty()
        && !outcomes
            .iter()
            .any(|o| matches!(o, OverrideOutcome::Applied { .. }))
    {
        tracing::warn!("No valid overrides were applied");
    }
    outcomes
}

/// Path of the patched copy: `<dir>/<stem>_<YYYYmmdd_HHMMSS>.json`.
pub fn temp_config_path(dir: &Path, source: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    dir.join(format!("{stem}_{}.json", now.format("%Y%m%d_%H%M%S")))
}

/// Write `doc` pretty-printed (two-space indent, UTF-8 kept as-is).
pub fn write_document(doc: &Document, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let text = serde_json::to_string_pretty(doc).map_err(anyhow::Error::from)?;
    fs::write(path, text)?;
    Ok(())
}

/// One override-and-run invocation.
#[derive(Debug, Clone)]
pub struct OverrideJob {
    pub json_path: PathBuf,
    pub overrides: Vec<String>,
    pub python: String,
    pub train_script: PathBuf,
    pub temp_dir: PathBuf,
    pub delete_temp_config: bool,
    /// Directory flags forwarded to the script, e.g. `("--vae-dir", "/models/vae")`.
    pub forwarded_dirs: Vec<(String, String)>,
}

impl OverrideJob {
    /// Command line for the training script.
    pub fn command(&self, temp_config: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.python)
            .arg(self.train_script.to_string_lossy())
            .arg(temp_config.to_string_lossy());
        for (flag, value) in &self.forwarded_dirs {
            spec = spec.arg(flag).arg(value);
        }
        spec.live(true)
    }

    /// Load, patch, write, run. Returns the script's exit code.
    pub fn run(&self, runner: &dyn CommandRunner) -> Result<i32> {
        tracing::info!("Loading original JSON config: {}", self.json_path.display());
        let mut doc = load_document(&self.json_path)?;

        if self.overrides.is_empty() {
            tracing::info!("No overrides specified");
        } else {
            apply_overrides(&mut doc, &self.overrides);
        }

        let temp_config = temp_config_path(&self.temp_dir, &self.json_path, Local::now());
        write_document(&doc, &temp_config)?;
        tracing::info!("Modified configuration saved to: {}", temp_config.display());

        let spec = self.command(&temp_config);
        tracing::info!("Executing: {}", spec.display());
        let result = match runner.run(&spec) {
            Ok(result) => Ok(result.exit_code.unwrap_or(0)),
            Err(ProvisionError::CommandFailed { exit_code, .. }) => {
                let code = exit_code.unwrap_or(1);
                tracing::error!("Training script failed with exit code {code}");
                Ok(code)
            }
            Err(e) => Err(e),
        };

        if self.delete_temp_config {
            match fs::remove_file(&temp_config) {
                Ok(()) => tracing::info!("Temporary config file deleted: {}", temp_config.display()),
                Err(e) => tracing::warn!(
                    "Failed to delete temporary config file '{}': {e}",
                    temp_config.display()
                ),
            }
        } else {
            tracing::info!("Temporary config file kept at: {}", temp_config.display());
        }

        result
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{MockResponse, MockRunner};
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc() -> Document {
        match json!({
            "lr": 0.001,
            "optimizer": "AdamW",
            "network": { "rank": 16, "alpha": 8 },
            "steps": 1000
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn top_level_key_is_replaced_with_inferred_type() {
        let mut doc = doc();
        let outcome = apply_override(&mut doc, "steps: 2000");
        assert!(matches!(outcome, OverrideOutcome::Applied { ref previous, .. } if *previous == json!(1000)));
        assert_eq!(doc["steps"], json!(2000));
    }

    #[test]
    fn value_may_contain_colons() {
        let mut doc = doc();
        apply_override(&mut doc, "optimizer:C:/opt/custom");
        assert_eq!(doc["optimizer"], json!("C:/opt/custom"));
    }

    #[test]
    fn dotted_key_traverses_objects() {
        let mut doc = doc();
        apply_override(&mut doc, "network.rank:32");
        assert_eq!(doc["network"]["rank"], json!(32));
    }

    #[test]
    fn unknown_keys_are_never_added() {
        let mut doc = doc();
        let before = doc.clone();
        for item in ["missing:1", "network.missing:1", "nope.rank:1", "lr.sub:1"] {
            assert!(matches!(apply_override(&mut doc, item), OverrideOutcome::Skipped { .. }));
        }
        assert_eq!(doc, before);
    }

    #[test]
    fn malformed_items_are_skipped() {
        let mut doc = doc();
        assert!(matches!(apply_override(&mut doc, "no-colon"), OverrideOutcome::Skipped { .. }));
        assert!(matches!(apply_override(&mut doc, " :5"), OverrideOutcome::Skipped { .. }));
    }

    #[test]
    fn temp_path_uses_stem_and_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();
        let path = temp_config_path(Path::new("temp_configs"), Path::new("/cfg/lora.json"), now);
        assert_eq!(path, Path::new("temp_configs/lora_20240501_130405.json"));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("list.json");
        fs::write(&path, "[1, 2]").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("got list"));
    }

    #[test]
    fn missing_file_is_an_override_error() {
        let err = load_document(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ProvisionError::OverrideError { .. }));
    }

    fn job(temp: &TempDir, delete: bool) -> OverrideJob {
        let json_path = temp.path().join("train.json");
        fs::write(&json_path, "{\"steps\": 10, \"name\": \"run\"}").unwrap();
        OverrideJob {
            json_path,
            overrides: vec!["steps:20".into()],
            python: "python3".into(),
            train_script: PathBuf::from("train_j.py"),
            temp_dir: temp.path().join("temp_configs"),
            delete_temp_config: delete,
            forwarded_dirs: vec![("--vae-dir".into(), "/models/vae".into())],
        }
    }

    fn written_configs(temp: &TempDir) -> Vec<PathBuf> {
        fs::read_dir(temp.path().join("temp_configs"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[test]
    fn run_writes_patched_copy_and_invokes_script() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();

        let code = job(&temp, false).run(&runner).unwrap();

        assert_eq!(code, 0);
        let written = written_configs(&temp);
        assert_eq!(written.len(), 1);
        let patched: Value = serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(patched, json!({"steps": 20, "name": "run"}));

        let call = &runner.calls()[0];
        assert!(call.starts_with("python3 train_j.py "));
        assert!(call.ends_with("--vae-dir /models/vae"));
        assert_eq!(runner.specs()[0].live_override(), Some(true));
    }

    #[test]
    fn script_exit_code_is_returned_and_temp_file_deleted() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        runner.respond("train_j.py", MockResponse::failure(2, "bad config"));

        let code = job(&temp, true).run(&runner).unwrap();

        assert_eq!(code, 2);
        assert!(written_configs(&temp).is_empty());
    }
}
