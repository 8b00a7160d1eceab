//! Idempotent package installation through pip.

use std::path::Path;

use crate::error::Result;
use crate::packages::accelerator::AcceleratorPlan;
use crate::packages::probe::CapabilityProbe;
use crate::packages::requirement::PackageRequirement;
use crate::shell::{CommandRunner, CommandSpec};

/// What an install call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The global skip switch is on; nothing was checked or run.
    Skipped,
    /// Already present and not forced.
    AlreadyInstalled,
    /// The installer ran successfully.
    Installed,
}

/// Installs packages only when absent or forced.
pub struct PackageInstaller<'a> {
    runner: &'a dyn CommandRunner,
    probe: CapabilityProbe<'a>,
    python: String,
    index_url: Option<String>,
    skip_install: bool,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        python: impl Into<String>,
        index_url: Option<String>,
        skip_install: bool,
    ) -> Self {
        let python = python.into();
        Self {
            runner,
            probe: CapabilityProbe::new(runner, python.clone()),
            python,
            index_url,
            skip_install,
        }
    }

    pub fn probe(&self) -> &CapabilityProbe<'a> {
        &self.probe
    }

    /// Install `requirement` unless it is already installed and `force` is off.
    ///
    /// `reason` names the package in progress and failure messages.
    pub fn install(
        &self,
        requirement: &PackageRequirement,
        reason: &str,
        force: bool,
    ) -> Result<InstallOutcome> {
        if self.skip_install {
            tracing::debug!(package = %requirement.name, "install skipped by configuration");
            return Ok(InstallOutcome::Skipped);
        }
        if !force && self.probe.is_installed(&requirement.name) {
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        self.run_pip(requirement.pip_args(), reason)?;
        Ok(InstallOutcome::Installed)
    }

    /// Install everything listed in a requirements file.
    pub fn install_requirements_file(&self, path: &Path) -> Result<InstallOutcome> {
        if self.skip_install {
            return Ok(InstallOutcome::Skipped);
        }
        self.run_pip(
            vec!["-r".to_string(), path.to_string_lossy().into_owned()],
            "requirements",
        )?;
        Ok(InstallOutcome::Installed)
    }

    /// Install the accelerator runtime when any of its packages is missing.
    ///
    /// Runs `<python> -m <plan args>` live. The global skip switch does not
    /// apply: the accelerator is the one package every launch needs.
    pub fn install_accelerator(&self, plan: &AcceleratorPlan, force: bool) -> Result<InstallOutcome> {
        let missing = plan
            .packages
            .iter()
            .any(|package| !self.probe.is_installed(package));
        if !force && !missing {
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let spec = CommandSpec::new(&self.python)
            .arg("-m")
            .args(plan.module_args.iter().cloned())
            .live(true)
            .describe(format!("Installing {}", plan.packages.join(" and ")))
            .on_error(format!("Couldn't install {}", plan.packages.join(" and ")));
        self.runner.run(&spec)?;
        Ok(InstallOutcome::Installed)
    }

    fn run_pip(&self, install_args: Vec<String>, reason: &str) -> Result<()> {
        let mut spec = CommandSpec::new(&self.python)
            .args(["-m", "pip", "install"])
            .args(install_args)
            .arg("--prefer-binary");
        if let Some(index_url) = &self.index_url {
            spec = spec.args(["--index-url", index_url.as_str()]);
        }
        let spec = spec
            .describe(format!("Installing {reason}"))
            .on_error(format!("Couldn't install {reason}"));
        self.runner.run(&spec)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcceleratorSettings;
    use crate::environment::HostPlatform;
    use crate::error::ProvisionError;
    use crate::packages::InstallFlags;
    use crate::shell::{MockResponse, MockRunner};

    fn not_installed(runner: &MockRunner) {
        runner.respond("importlib", MockResponse::failure(1, "missing"));
    }

    #[test]
    fn installed_package_issues_no_install() {
        let runner = MockRunner::new();
        let installer = PackageInstaller::new(&runner, "python3", None, false);

        let outcome = installer
            .install(&PackageRequirement::new("clip"), "clip", false)
            .unwrap();

        assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        assert_eq!(runner.count_matching("pip"), 0);
    }

    #[test]
    fn skip_install_spawns_nothing() {
        let runner = MockRunner::new();
        let installer = PackageInstaller::new(&runner, "python3", None, true);

        let outcome = installer
            .install(&PackageRequirement::new("anything"), "anything", true)
            .unwrap();
        let file = installer
            .install_requirements_file(Path::new("requirements.txt"))
            .unwrap();

        assert_eq!(outcome, InstallOutcome::Skipped);
        assert_eq!(file, InstallOutcome::Skipped);
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn missing_package_is_installed_with_prefer_binary() {
        let runner = MockRunner::new();
        not_installed(&runner);
        let installer = PackageInstaller::new(&runner, "python3", None, false);

        let outcome = installer
            .install(&PackageRequirement::new("ngrok"), "ngrok", false)
            .unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        let calls = runner.calls();
        assert_eq!(
            calls.last().unwrap(),
            "python3 -m pip install ngrok --prefer-binary"
        );
    }

    #[test]
    fn force_skips_installed_check() {
        let runner = MockRunner::new();
        let installer = PackageInstaller::new(&runner, "python3", None, false);
        let req = PackageRequirement::with_spec("xformers", "xformers==0.0.27").flags(InstallFlags {
            no_deps: true,
            force_reinstall: true,
            upgrade: true,
        });

        installer.install(&req, "xformers", true).unwrap();

        assert_eq!(runner.call_count(), 1);
        assert_eq!(
            runner.calls()[0],
            "python3 -m pip install -U -I --no-deps xformers==0.0.27 --prefer-binary"
        );
    }

    #[test]
    fn index_url_is_appended_when_configured() {
        let runner = MockRunner::new();
        let installer = PackageInstaller::new(
            &runner,
            "python3",
            Some("https://mirror.example/simple".into()),
            false,
        );

        installer
            .install_requirements_file(Path::new("reqs.txt"))
            .unwrap();

        assert_eq!(
            runner.calls()[0],
            "python3 -m pip install -r reqs.txt --prefer-binary --index-url https://mirror.example/simple"
        );
    }

    #[test]
    fn install_failure_propagates_without_retry() {
        let runner = MockRunner::new();
        not_installed(&runner);
        runner.respond("pip install", MockResponse::failure(1, "No matching distribution"));
        let installer = PackageInstaller::new(&runner, "python3", None, false);

        let err = installer
            .install(&PackageRequirement::new("clip"), "clip", false)
            .unwrap_err();

        assert!(matches!(err, ProvisionError::CommandFailed { .. }));
        assert!(err.to_string().contains("Couldn't install clip"));
        assert_eq!(runner.count_matching("pip install"), 1);
    }

    #[test]
    fn accelerator_skipped_when_all_packages_present() {
        let runner = MockRunner::new();
        let installer = PackageInstaller::new(&runner, "python3", None, false);
        let plan = AcceleratorPlan::from_settings(&AcceleratorSettings::default(), HostPlatform::Other);

        let outcome = installer.install_accelerator(&plan, false).unwrap();

        assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        assert_eq!(runner.count_matching("pip install"), 0);
    }

    #[test]
    fn accelerator_installed_live_when_forced() {
        let runner = MockRunner::new();
        let installer = PackageInstaller::new(&runner, "python3", None, true);
        let plan = AcceleratorPlan::from_settings(&AcceleratorSettings::default(), HostPlatform::Other);

        let outcome = installer.install_accelerator(&plan, true).unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        let spec = runner.specs().pop().unwrap();
        assert_eq!(spec.live_override(), Some(true));
        assert!(spec.display().starts_with("python3 -m pip install torch==2.3.1"));
    }
}
