//! Configuration schema.
//!
//! [`ProvisionConfig`] is built once at startup (defaults, then the optional
//! YAML file, then environment variables, then CLI flags) and passed by
//! reference into every component. No component reads process-wide state
//! on its own.

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{ProvisionError, Result};

/// Default pip index for the CUDA accelerator wheels.
pub const DEFAULT_TORCH_INDEX_URL: &str = "https://download.pytorch.org/whl/cu121";

/// Default companion repository.
pub const DEFAULT_COMPANION_URL: &str = "https://github.com/hako-mikan/sd-webui-traintrain.git";

/// Complete provisioning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Host application directory. Relative paths resolve against it.
    pub root: PathBuf,

    /// Interpreter used for pip, probes and the handoff.
    pub python: String,

    /// Git executable.
    pub git: String,

    /// Package index override for pip (`None` = pip default).
    pub index_url: Option<String>,

    /// Requirements file name, looked up in the working dir then `root`.
    pub requirements_file: String,

    /// Stream command output by default instead of capturing it.
    pub live_output: bool,

    pub accelerator: AcceleratorSettings,
    pub packages: PackageSettings,
    pub companion: CompanionSettings,
    pub flags: Flags,
    pub handoff: HandoffSettings,
}

/// Core accelerator runtime installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcceleratorSettings {
    /// Full pip argument list replacing the default install command,
    /// e.g. `pip install torch==2.3.1 --extra-index-url ...`.
    pub command: Option<String>,

    /// Extra index for the default install command.
    pub index_url: Option<String>,

    /// Use the Intel XPU builds instead of CUDA.
    pub use_ipex: bool,
}

/// Auxiliary package specs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSettings {
    pub xformers: String,
    pub clip: String,
    pub open_clip: String,
    /// Tunnel auth token; the tunnel package is only installed when set.
    pub ngrok_token: Option<String>,
}

/// Companion repository checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompanionSettings {
    pub url: String,
    pub branch: String,
    /// Directory under `root`, also used as the display name.
    pub dir: String,
}

/// Stage toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Flags {
    pub skip_prepare_environment: bool,
    pub skip_install: bool,
    pub skip_python_version_check: bool,
    pub skip_torch_cuda_test: bool,
    pub reinstall_torch: bool,
    pub reinstall_xformers: bool,
    pub xformers: bool,
    pub disable_update: bool,
}

/// Downstream application entry point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandoffSettings {
    /// Arguments passed to the interpreter, e.g. `["-c", "..."]` or
    /// `["launch.py"]`.
    pub args: Vec<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            python: default_python().to_string(),
            git: "git".to_string(),
            index_url: None,
            requirements_file: "requirements_versions.txt".to_string(),
            live_output: false,
            accelerator: AcceleratorSettings::default(),
            packages: PackageSettings::default(),
            companion: CompanionSettings::default(),
            flags: Flags::default(),
            handoff: HandoffSettings::default(),
        }
    }
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            xformers: "xformers==0.0.27".to_string(),
            clip: "https://github.com/openai/CLIP/archive/d50d76daa670286dd6cacf3bcd80b5e4823fc8e1.zip"
                .to_string(),
            open_clip:
                "https://github.com/mlfoundations/open_clip/archive/bb6e834e9c70d9c27d0dc3ecedeebeaeb1ffad6b.zip"
                    .to_string(),
            ngrok_token: None,
        }
    }
}

impl Default for CompanionSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_COMPANION_URL.to_string(),
            branch: "main".to_string(),
            dir: "traintrain".to_string(),
        }
    }
}

impl Default for HandoffSettings {
    fn default() -> Self {
        Self {
            args: vec![
                "-c".to_string(),
                "import traintrain.scripts.traintrain as t; t.launch()".to_string(),
            ],
        }
    }
}

fn default_python() -> &'static str {
    if cfg!(target_os = "windows") {
        "python"
    } else {
        "python3"
    }
}

impl ProvisionConfig {
    /// Local path of the companion checkout.
    pub fn companion_path(&self) -> PathBuf {
        self.root.join(&self.companion.dir)
    }

    /// Marker file left behind by an interrupted restart.
    pub fn restart_marker_path(&self) -> PathBuf {
        self.root.join("tmp").join("restart")
    }

    /// Whether the accelerator availability probe should run.
    ///
    /// The Intel XPU builds have no CUDA, so the probe is implied off.
    pub fn runs_accelerator_check(&self) -> bool {
        !self.flags.skip_torch_cuda_test && !self.accelerator.use_ipex
    }

    /// Reject values that would make later stages fail obscurely.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("python", self.python.as_str()),
            ("git", self.git.as_str()),
            ("companion.url", self.companion.url.as_str()),
            ("companion.branch", self.companion.branch.as_str()),
            ("companion.dir", self.companion.dir.as_str()),
            ("requirements_file", self.requirements_file.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ProvisionError::ConfigValidationError {
                    message: format!("'{field}' must not be empty"),
                });
            }
        }
        if self.companion.branch.starts_with('-') {
            return Err(ProvisionError::ConfigValidationError {
                message: format!("invalid branch name '{}'", self.companion.branch),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ProvisionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.companion.branch, "main");
        assert_eq!(config.requirements_file, "requirements_versions.txt");
        assert!(config.index_url.is_none());
        assert!(!config.live_output);
    }

    #[test]
    fn companion_path_is_under_root() {
        let config = ProvisionConfig {
            root: PathBuf::from("/srv/app"),
            ..Default::default()
        };
        assert_eq!(config.companion_path(), PathBuf::from("/srv/app/traintrain"));
        assert_eq!(
            config.restart_marker_path(),
            PathBuf::from("/srv/app/tmp/restart")
        );
    }

    #[test]
    fn ipex_disables_accelerator_check() {
        let mut config = ProvisionConfig::default();
        assert!(config.runs_accelerator_check());
        config.accelerator.use_ipex = true;
        assert!(!config.runs_accelerator_check());
    }

    #[test]
    fn empty_branch_is_rejected() {
        let mut config = ProvisionConfig::default();
        config.companion.branch = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("companion.branch"));
    }

    #[test]
    fn option_like_branch_is_rejected() {
        let mut config = ProvisionConfig::default();
        config.companion.branch = "--upload-pack=evil".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "companion:\n  branch: dev\nflags:\n  skip_install: true\n";
        let config: ProvisionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.companion.branch, "dev");
        assert_eq!(config.companion.dir, "traintrain");
        assert!(config.flags.skip_install);
        assert!(!config.flags.disable_update);
    }

    #[test]
    fn unknown_yaml_fields_are_rejected() {
        let yaml = "companoin:\n  branch: dev\n";
        assert!(serde_yaml::from_str::<ProvisionConfig>(yaml).is_err());
    }
}
