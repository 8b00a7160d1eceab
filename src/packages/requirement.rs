//! Package requirements.

/// A package to install through pip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequirement {
    /// Name checked by the capability probe (distribution or module name).
    pub name: String,
    /// What pip installs: a pinned spec, an archive URL, or the bare name.
    pub spec: String,
    pub flags: InstallFlags,
}

/// Extra pip switches for a requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallFlags {
    /// `--no-deps`
    pub no_deps: bool,
    /// `-I` (`--ignore-installed`)
    pub force_reinstall: bool,
    /// `-U`
    pub upgrade: bool,
}

impl PackageRequirement {
    /// Requirement whose install spec is just its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            spec: name.clone(),
            name,
            flags: InstallFlags::default(),
        }
    }

    /// Requirement installed from a different spec than its name.
    pub fn with_spec(name: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: spec.into(),
            flags: InstallFlags::default(),
        }
    }

    pub fn flags(mut self, flags: InstallFlags) -> Self {
        self.flags = flags;
        self
    }

    /// pip arguments after `install`.
    pub fn pip_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.flags.upgrade {
            args.push("-U".to_string());
        }
        if self.flags.force_reinstall {
            args.push("-I".to_string());
        }
        if self.flags.no_deps {
            args.push("--no-deps".to_string());
        }
        args.push(self.spec.clone());
        args
    }
}
