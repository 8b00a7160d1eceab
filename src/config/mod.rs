//! Configuration loading for the provisioner.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Environment variable overrides in [`env`]
//!
//! # Example
//!
//! ```
//! use launchprep::config::{apply_env_overrides, load_config};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(temp.path().join("launchprep.yml"), "companion:\n  branch: dev\n").unwrap();
//!
//! let mut config = load_config(temp.path(), None).unwrap();
//! apply_env_overrides(&mut config, |key| match key {
//!     "INDEX_URL" => Ok("https://mirror.example/simple".to_string()),
//!     _ => Err(std::env::VarError::NotPresent),
//! });
//! config.validate().unwrap();
//! assert_eq!(config.companion.branch, "dev");
//! assert_eq!(config.index_url.as_deref(), Some("https://mirror.example/simple"));
//! ```
//!
//! # Precedence
//!
//! 1. Built-in defaults
//! 2. `launchprep.yml` in the application root (or `--config`)
//! 3. Environment variables
//! 4. Command-line flags

pub mod env;
pub mod loader;
pub mod schema;

pub use env::{apply_env_overrides, apply_system_env, ENV_VARS};
pub use loader::{find_config_file, load_config, parse_config, CONFIG_FILE_NAME};
pub use schema::{
    AcceleratorSettings, CompanionSettings, Flags, HandoffSettings, PackageSettings,
    ProvisionConfig, DEFAULT_COMPANION_URL, DEFAULT_TORCH_INDEX_URL,
};
