//! Host and interpreter environment checks.

pub mod interpreter;
pub mod platform;

pub use interpreter::{
    check_version, is_supported, parse_version, query_version, supported_minors,
    unsupported_explanation, InterpreterVersion, VersionCheck,
};
pub use platform::HostPlatform;
