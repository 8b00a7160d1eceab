//! Environment variable overrides.
//!
//! Variables are read through a lookup function so the overlay can be
//! tested without touching the real process environment.

use crate::config::schema::ProvisionConfig;

/// Environment variables recognised by [`apply_env_overrides`].
pub const ENV_VARS: &[&str] = &[
    "PYTHON",
    "GIT",
    "INDEX_URL",
    "TORCH_COMMAND",
    "TORCH_INDEX_URL",
    "REQS_FILE",
    "XFORMERS_PACKAGE",
    "CLIP_PACKAGE",
    "OPENCLIP_PACKAGE",
    "WEBUI_LAUNCH_LIVE_OUTPUT",
];

/// Overlay the real process environment onto `config`.
pub fn apply_system_env(config: &mut ProvisionConfig) {
    apply_env_overrides(config, |key: &str| std::env::var(key));
}

/// Overlay environment values onto `config` using a custom lookup.
///
/// Empty values for optional settings (`INDEX_URL`, `TORCH_INDEX_URL`,
/// `TORCH_COMMAND`) clear them, matching "empty means default source".
pub fn apply_env_overrides<F>(config: &mut ProvisionConfig, env_fn: F)
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let get = |key: &str| env_fn(key).ok();
    let non_empty = |value: String| (!value.trim().is_empty()).then_some(value);

    if let Some(python) = get("PYTHON").and_then(non_empty) {
        config.python = python;
    }
    if let Some(git) = get("GIT").and_then(non_empty) {
        config.git = git;
    }
    if let Some(index_url) = get("INDEX_URL") {
        config.index_url = non_empty(index_url);
    }
    if let Some(command) = get("TORCH_COMMAND") {
        config.accelerator.command = non_empty(command);
    }
    if let Some(index_url) = get("TORCH_INDEX_URL") {
        config.accelerator.index_url = non_empty(index_url);
    }
    if let Some(file) = get("REQS_FILE").and_then(non_empty) {
        config.requirements_file = file;
    }
    if let Some(spec) = get("XFORMERS_PACKAGE").and_then(non_empty) {
        config.packages.xformers = spec;
    }
    if let Some(spec) = get("CLIP_PACKAGE").and_then(non_empty) {
        config.packages.clip = spec;
    }
    if let Some(spec) = get("OPENCLIP_PACKAGE").and_then(non_empty) {
        config.packages.open_clip = spec;
    }
    if let Some(live) = get("WEBUI_LAUNCH_LIVE_OUTPUT") {
        config.live_output = live.trim() == "1";
    }
}
