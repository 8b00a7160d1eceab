//! Package probing and installation.
//!
//! - [`probe`] - capability probes against the target interpreter
//! - [`requirement`] - package requirement types
//! - [`installer`] - idempotent pip installs
//! - [`accelerator`] - the core accelerator runtime install plan

pub mod accelerator;
pub mod installer;
pub mod probe;
pub mod requirement;

pub use accelerator::{AcceleratorPlan, CUDA_PROBE};
pub use installer::{InstallOutcome, PackageInstaller};
pub use probe::CapabilityProbe;
pub use requirement::{InstallFlags, PackageRequirement};
