//! Interpreter version check.
//!
//! The check only warns. An unsupported version is the most common cause of
//! later install failures, so the warning spells out what to do about it.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::environment::HostPlatform;
use crate::shell::{CommandRunner, CommandSpec};

/// A `major.minor.micro` interpreter version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl fmt::Display for InterpreterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

/// Result of checking the interpreter against the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    Supported(InterpreterVersion),
    Unsupported(InterpreterVersion),
    /// The interpreter could not be run or its output was not understood.
    Unknown,
}

/// Minor versions of Python 3 known to work on `platform`.
pub fn supported_minors(platform: HostPlatform) -> &'static [u32] {
    match platform {
        HostPlatform::Windows => &[10],
        HostPlatform::Other => &[7, 8, 9, 10, 11],
    }
}

/// Regex for `major.minor[.micro]` anywhere in the output.
static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("VERSION_REGEX must compile")
});

/// Extract a version from `python --version` style output.
pub fn parse_version(output: &str) -> Option<InterpreterVersion> {
    let caps = VERSION_REGEX.captures(output)?;
    Some(InterpreterVersion {
        major: caps.get(1)?.as_str().parse().ok()?,
        minor: caps.get(2)?.as_str().parse().ok()?,
        micro: caps
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0),
    })
}

/// Whether `version` is in the allow-list for `platform`.
pub fn is_supported(version: InterpreterVersion, platform: HostPlatform) -> bool {
    version.major == 3 && supported_minors(platform).contains(&version.minor)
}

/// Query the interpreter's version.
pub fn query_version(runner: &dyn CommandRunner, python: &str) -> Option<InterpreterVersion> {
    let spec = CommandSpec::new(python).arg("--version").live(false);
    match runner.run(&spec) {
        // Older interpreters print the version on stderr.
        Ok(result) => parse_version(&result.stdout).or_else(|| parse_version(&result.stderr)),
        Err(e) => {
            tracing::warn!("Could not determine interpreter version: {e}");
            None
        }
    }
}

/// Query and classify the interpreter version.
pub fn check_version(runner: &dyn CommandRunner, python: &str, platform: HostPlatform) -> VersionCheck {
    match query_version(runner, python) {
        Some(version) if is_supported(version, platform) => VersionCheck::Supported(version),
        Some(version) => VersionCheck::Unsupported(version),
        None => VersionCheck::Unknown,
    }
}

/// Explanation shown when the version is outside the allow-list.
pub fn unsupported_explanation(version: InterpreterVersion) -> String {
    format!(
        "INCOMPATIBLE PYTHON VERSION\n\
         \n\
         This program is tested with 3.10.6 Python, but you have {version}.\n\
         If you encounter an error with \"RuntimeError: Couldn't install torch.\" message,\n\
         or any other error regarding unsuccessful package (library) installation,\n\
         please downgrade (or upgrade) to the latest version of 3.10 Python\n\
         and delete current Python and \"venv\" folder in the application directory.\n\
         \n\
         You can download 3.10 Python from here: https://www.python.org/downloads/release/python-3106/"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{MockResponse, MockRunner};

    fn v(major: u32, minor: u32, micro: u32) -> InterpreterVersion {
        InterpreterVersion {
            major,
            minor,
            micro,
        }
    }

    #[test]
    fn parses_standard_output() {
        assert_eq!(parse_version("Python 3.10.6\n"), Some(v(3, 10, 6)));
        assert_eq!(parse_version("Python 3.12.0rc1"), Some(v(3, 12, 0)));
        assert_eq!(parse_version("Python 3.9"), Some(v(3, 9, 0)));
        assert_eq!(parse_version("no version here"), None);
    }

    #[test]
    fn windows_allows_only_310() {
        assert!(is_supported(v(3, 10, 6), HostPlatform::Windows));
        assert!(!is_supported(v(3, 11, 1), HostPlatform::Windows));
    }

    #[test]
    fn other_platforms_allow_37_to_311() {
        for minor in 7..=11 {
            assert!(is_supported(v(3, minor, 0), HostPlatform::Other));
        }
        assert!(!is_supported(v(3, 12, 0), HostPlatform::Other));
        assert!(!is_supported(v(2, 7, 18), HostPlatform::Other));
    }

    #[test]
    fn check_classifies_unsupported_version() {
        let runner = MockRunner::new();
        runner.respond("--version", MockResponse::stdout("Python 3.12.1\n"));
        assert_eq!(
            check_version(&runner, "python3", HostPlatform::Other),
            VersionCheck::Unsupported(v(3, 12, 1))
        );
    }

    #[test]
    fn missing_interpreter_is_unknown() {
        let runner = MockRunner::new();
        runner.respond("--version", MockResponse::NotFound);
        assert_eq!(
            check_version(&runner, "python3", HostPlatform::Other),
            VersionCheck::Unknown
        );
    }

    #[test]
    fn explanation_names_the_version() {
        let text = unsupported_explanation(v(3, 12, 1));
        assert!(text.starts_with("INCOMPATIBLE PYTHON VERSION"));
        assert!(text.contains("you have 3.12.1"));
    }
}
