//! Configuration file discovery and loading.

use crate::config::schema::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up under the host application root.
pub const CONFIG_FILE_NAME: &str = "launchprep.yml";

/// Find the config file to load.
///
/// An explicit path must exist. Otherwise `<root>/launchprep.yml` is used
/// when present, and `None` means "defaults only".
pub fn find_config_file(root: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ProvisionError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        return Ok(Some(path.to_path_buf()));
    }

    let candidate = root.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        Ok(Some(candidate))
    } else {
        Ok(None)
    }
}

/// Parse a YAML config document.
pub fn parse_config(content: &str, path: &Path) -> Result<ProvisionConfig> {
    if content.trim().is_empty() {
        return Ok(ProvisionConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ProvisionError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load configuration for `root`, falling back to defaults.
///
/// The returned config always has `root` set to the given directory, so a
/// file cannot relocate the application it sits in.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<ProvisionConfig> {
    let mut config = match find_config_file(root, explicit)? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            let content = fs::read_to_string(&path)?;
            parse_config(&content, &path)?
        }
        None => ProvisionConfig::default(),
    };
    config.root = root.to_path_buf();
    Ok(config)
}
