//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// launchprep - prepare the runtime, sync the companion checkout, launch.
#[derive(Debug, Parser)]
#[command(name = "launchprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides <root>/launchprep.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Application root (overrides current directory)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Prepare the environment and launch (default if no command specified)
    Prepare(PrepareArgs),

    /// Patch a JSON training config and run the training script with it
    Override(OverrideArgs),
}

/// Arguments for the `prepare` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PrepareArgs {
    /// Companion branch to track
    #[arg(long)]
    pub branch: Option<String>,

    /// Do not check the interpreter version
    #[arg(long)]
    pub skip_python_version_check: bool,

    /// Do not check that torch can use the GPU
    #[arg(long)]
    pub skip_torch_cuda_test: bool,

    /// Reinstall xformers even if present
    #[arg(long)]
    pub reinstall_xformers: bool,

    /// Reinstall torch even if present
    #[arg(long)]
    pub reinstall_torch: bool,

    /// Do not checkout and pull the companion branch
    #[arg(long)]
    pub disable_update: bool,

    /// Skip every preparation stage and launch directly
    #[arg(long)]
    pub skip_prepare_environment: bool,

    /// Never run pip for auxiliary packages or requirements
    #[arg(long)]
    pub skip_install: bool,

    /// Install xformers
    #[arg(long)]
    pub xformers: bool,

    /// Use Intel XPU builds of torch
    #[arg(long)]
    pub use_ipex: bool,

    /// ngrok auth token; installs ngrok when set
    #[arg(long, value_name = "TOKEN")]
    pub ngrok: Option<String>,

    /// Arguments passed through to the launched application
    #[arg(last = true)]
    pub forwarded: Vec<String>,
}

/// Arguments for the `override` command.
#[derive(Debug, Clone, clap::Args)]
pub struct OverrideArgs {
    /// Original JSON configuration file
    pub json_path: PathBuf,

    /// Override a parameter: KEY:VALUE, dotted keys allowed, type inferred
    #[arg(long = "override", value_name = "KEY:VALUE", num_args = 1.., action = ArgAction::Append)]
    pub overrides: Vec<String>,

    /// Training script to run
    #[arg(long, default_value = "train_j.py")]
    pub train_script_path: PathBuf,

    /// Directory for the patched configuration copies
    #[arg(long, default_value = "temp_configs")]
    pub temp_config_dir: PathBuf,

    /// Delete the patched copy after the script finishes
    #[arg(long)]
    pub delete_temp_config: bool,

    /// Base directory for models (passed to the script)
    #[arg(long)]
    pub models_dir: Option<String>,

    /// Directory for checkpoints (passed to the script)
    #[arg(long)]
    pub ckpt_dir: Option<String>,

    /// Directory for VAE models (passed to the script)
    #[arg(long)]
    pub vae_dir: Option<String>,

    /// Directory for LoRA models (passed to the script)
    #[arg(long)]
    pub lora_dir: Option<String>,
}

impl OverrideArgs {
    /// Directory flags to forward, in a fixed order.
    pub fn forwarded_dirs(&self) -> Vec<(String, String)> {
        [
            ("--models-dir", &self.models_dir),
            ("--ckpt-dir", &self.ckpt_dir),
            ("--vae-dir", &self.vae_dir),
            ("--lora-dir", &self.lora_dir),
        ]
        .into_iter()
        .filter_map(|(flag, value)| value.as_ref().map(|v| (flag.to_string(), v.clone())))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_prepare_defaults() {
        let cli = Cli::try_parse_from(["launchprep"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn prepare_collects_trailing_args() {
        let cli = Cli::try_parse_from([
            "launchprep",
            "prepare",
            "--xformers",
            "--branch",
            "dev",
            "--",
            "--port",
            "7860",
        ])
        .unwrap();
        let Some(Commands::Prepare(args)) = cli.command else {
            panic!("expected prepare");
        };
        assert!(args.xformers);
        assert_eq!(args.branch.as_deref(), Some("dev"));
        assert_eq!(args.forwarded, vec!["--port", "7860"]);
    }

    #[test]
    fn override_accepts_several_items() {
        let cli = Cli::try_parse_from([
            "launchprep",
            "override",
            "cfg.json",
            "--override",
            "lr:0.1",
            "steps:5",
            "--vae-dir",
            "/vae",
            "--override",
            "network.rank:8",
        ])
        .unwrap();
        let Some(Commands::Override(args)) = cli.command else {
            panic!("expected override");
        };
        assert_eq!(args.overrides, vec!["lr:0.1", "steps:5", "network.rank:8"]);
        assert_eq!(args.train_script_path, PathBuf::from("train_j.py"));
        assert_eq!(
            args.forwarded_dirs(),
            vec![("--vae-dir".to_string(), "/vae".to_string())]
        );
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from(["launchprep", "prepare", "--debug", "--root", "/app"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.root, Some(PathBuf::from("/app")));
    }
}
