//! Host platform detection.

/// Platform families that change provisioning behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Other,
}

impl HostPlatform {
    /// Platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            HostPlatform::Windows
        } else {
            HostPlatform::Other
        }
    }

    pub fn is_windows(self) -> bool {
        self == HostPlatform::Windows
    }
}
