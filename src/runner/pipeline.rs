//! The provisioning pipeline.
//!
//! [`Provisioner::prepare`] runs every stage in a fixed order and stops at
//! the first fatal error, so the handoff never starts on a half-prepared
//! environment. Install and clone failures are fatal. Marker cleanup and
//! the auto-update are best-effort. The accelerator check is fatal only
//! when enabled.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ProvisionConfig;
use crate::environment::{check_version, unsupported_explanation, HostPlatform, VersionCheck};
use crate::error::{ProvisionError, Result};
use crate::packages::{
    AcceleratorPlan, InstallFlags, InstallOutcome, PackageInstaller, PackageRequirement,
    CUDA_PROBE,
};
use crate::repository::{CommitResolver, RepositorySynchronizer, RepositoryTarget, SyncOutcome};
use crate::shell::CommandRunner;
use crate::ui::Diagnostic;

const CUDA_REMEDIATION: &str = "Your device does not support the current version of Torch/CUDA! \
     Consider downloading another version: \
     https://github.com/lllyasviel/stable-diffusion-webui-forge/releases/tag/latest";

/// What each stage of a [`Provisioner::prepare`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Preparation was turned off entirely.
    pub skipped: bool,
    /// A stale restart marker was found and removed.
    pub restart_marker_removed: bool,
    /// `None` when the version check is disabled.
    pub interpreter: Option<VersionCheck>,
    pub accelerator: Option<InstallOutcome>,
    /// The accelerator availability probe ran (and passed).
    pub accelerator_checked: bool,
    /// Auxiliary packages in the order they were considered.
    pub packages: Vec<(String, InstallOutcome)>,
    /// Resolved branch tip the companion was pinned to.
    pub companion_commit: Option<String>,
    pub companion: Option<SyncOutcome>,
    /// The branch checkout and pull both ran without error.
    pub companion_updated: bool,
    /// Requirements file that was installed, if one was found.
    pub requirements_file: Option<PathBuf>,
    pub requirements: Option<InstallOutcome>,
}

/// Prepares the runtime described by a [`ProvisionConfig`].
pub struct Provisioner<'a> {
    config: &'a ProvisionConfig,
    runner: &'a dyn CommandRunner,
    platform: HostPlatform,
    working_dir: PathBuf,
}

impl<'a> Provisioner<'a> {
    pub fn new(config: &'a ProvisionConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            platform: HostPlatform::current(),
            working_dir: PathBuf::from("."),
        }
    }

    /// Override the detected host platform.
    pub fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Directory searched first for the requirements file.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Run all stages.
    pub fn prepare(&self) -> Result<ProvisionReport> {
        let config = self.config;
        let mut report = ProvisionReport::default();

        if config.flags.skip_prepare_environment {
            tracing::info!("Skipping environment preparation");
            report.skipped = true;
            return Ok(report);
        }

        report.restart_marker_removed = self.remove_restart_marker();

        if !config.flags.skip_python_version_check {
            report.interpreter = Some(self.check_interpreter());
        }

        let installer = PackageInstaller::new(
            self.runner,
            &config.python,
            config.index_url.clone(),
            config.flags.skip_install,
        );

        let plan = AcceleratorPlan::from_settings(&config.accelerator, self.platform);
        report.accelerator = Some(installer.install_accelerator(&plan, config.flags.reinstall_torch)?);

        if config.runs_accelerator_check() {
            if !installer.probe().probe_runtime(CUDA_PROBE) {
                return Err(ProvisionError::CapabilityUnavailable {
                    capability: "Torch GPU support".to_string(),
                    remediation: CUDA_REMEDIATION.to_string(),
                });
            }
            report.accelerator_checked = true;
        }

        report.packages = self.install_auxiliary(&installer)?;

        let (commit, outcome) = self.sync_companion()?;
        report.companion_commit = commit;
        report.companion = Some(outcome);

        if !config.flags.disable_update {
            report.companion_updated = self.update_companion();
        }

        match self.find_requirements_file() {
            Some(path) => {
                tracing::info!("Installing requirements from {}...", path.display());
                report.requirements = Some(installer.install_requirements_file(&path)?);
                report.requirements_file = Some(path);
            }
            None => tracing::warn!(
                "Requirements file not found: {}. Skipping installation of requirements.",
                config.root.join(&config.requirements_file).display()
            ),
        }

        Ok(report)
    }

    fn remove_restart_marker(&self) -> bool {
        let marker = self.config.restart_marker_path();
        match fs::remove_file(&marker) {
            Ok(()) => {
                tracing::debug!("Removed restart marker {}", marker.display());
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Could not remove restart signal file: {e}");
                false
            }
        }
    }

    fn check_interpreter(&self) -> VersionCheck {
        let check = check_version(self.runner, &self.config.python, self.platform);
        match &check {
            VersionCheck::Supported(version) => tracing::info!("Python {version}"),
            VersionCheck::Unsupported(version) => {
                let text = unsupported_explanation(*version);
                let (title, body) = text.split_once('\n').unwrap_or((text.as_str(), ""));
                Diagnostic::warning(title, body.trim_start())
                    .with_hint("Use --skip-python-version-check to suppress this message.")
                    .eprint();
            }
            VersionCheck::Unknown => {
                tracing::warn!("Could not determine the version of '{}'", self.config.python)
            }
        }
        check
    }

    fn install_auxiliary(&self, installer: &PackageInstaller<'_>) -> Result<Vec<(String, InstallOutcome)>> {
        let config = self.config;
        let mut outcomes = Vec::new();

        let clip = PackageRequirement::with_spec("clip", &config.packages.clip);
        outcomes.push(("clip".to_string(), installer.install(&clip, "clip", false)?));

        let open_clip = PackageRequirement::with_spec("open_clip", &config.packages.open_clip);
        outcomes.push((
            "open_clip".to_string(),
            installer.install(&open_clip, "open_clip", false)?,
        ));

        if config.flags.xformers {
            let xformers = PackageRequirement::with_spec("xformers", &config.packages.xformers).flags(
                InstallFlags {
                    no_deps: true,
                    force_reinstall: true,
                    upgrade: true,
                },
            );
            let outcome = installer.install(&xformers, "xformers", config.flags.reinstall_xformers)?;
            outcomes.push(("xformers".to_string(), outcome));
        }

        if config.packages.ngrok_token.is_some() {
            let ngrok = PackageRequirement::new("ngrok");
            outcomes.push(("ngrok".to_string(), installer.install(&ngrok, "ngrok", false)?));
        }

        Ok(outcomes)
    }

    fn sync_companion(&self) -> Result<(Option<String>, SyncOutcome)> {
        let companion = &self.config.companion;
        let synchronizer = RepositorySynchronizer::new(self.runner, &self.config.git);
        tracing::info!(
            "Preparing '{}' repository ({}) on branch '{}'...",
            companion.dir,
            companion.url,
            companion.branch
        );

        let commit = CommitResolver::new(synchronizer.git())
            .resolve_branch_tip(&companion.url, &companion.branch);
        let mut target = RepositoryTarget::new(
            &companion.url,
            self.config.companion_path(),
            &companion.dir,
        );
        match &commit {
            Some(hash) => {
                tracing::info!(
                    "Target commit for '{}' (branch: {}): {hash}",
                    companion.dir,
                    companion.branch
                );
                target = target.at_commit(hash);
            }
            None => tracing::warn!(
                "Could not determine the latest commit for branch '{}' of '{}'; \
                 using the default branch or the existing checkout",
                companion.branch,
                companion.dir
            ),
        }

        let outcome = synchronizer.sync(&target)?;
        Ok((commit, outcome))
    }

    fn update_companion(&self) -> bool {
        let companion = &self.config.companion;
        let path = self.config.companion_path();
        if !path.join(".git").exists() {
            tracing::info!(
                "Skipping pull for '{}' as the repository does not exist at {}",
                companion.dir,
                path.display()
            );
            return false;
        }

        let synchronizer = RepositorySynchronizer::new(self.runner, &self.config.git);
        if let Err(e) = synchronizer.checkout_branch(&path, &companion.dir, &companion.branch) {
            tracing::warn!(
                "Failed to ensure branch '{}' for '{}': {e}",
                companion.branch,
                companion.dir
            );
            return false;
        }
        synchronizer.pull(&path);
        true
    }

    fn find_requirements_file(&self) -> Option<PathBuf> {
        let name = Path::new(&self.config.requirements_file);
        [self.working_dir.join(name), self.config.root.join(name)]
            .into_iter()
            .find(|candidate| candidate.is_file())
    }
}
