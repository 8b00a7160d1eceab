//! Environment orchestration.
//!
//! - [`pipeline`] - the ordered provisioning stages
//! - [`handoff`] - launching the downstream application

pub mod handoff;
pub mod pipeline;

pub use handoff::{handoff_command, launch, HANDOFF_ENV_DEFAULTS};
pub use pipeline::{ProvisionReport, Provisioner};
