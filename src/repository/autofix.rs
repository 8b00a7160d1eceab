//! Bounded repair-then-retry.
//!
//! An [`Autofix`] guards a sequence of workspace operations. The first
//! failure triggers the repair action and exactly one retry of the failed
//! operation. After that the budget is spent: later failures, including a
//! failed retry, are returned as they are. One instance covers one sync
//! call, which bounds the cost of recovery.
//!
//! # Example
//!
//! ```
//! use launchprep::repository::Autofix;
//! use launchprep::ProvisionError;
//! use std::cell::Cell;
//!
//! let attempts = Cell::new(0);
//! let repairs = Cell::new(0);
//! let mut autofix = Autofix::new("demo");
//!
//! let value = autofix
//!     .attempt(
//!         "flaky operation",
//!         || {
//!             attempts.set(attempts.get() + 1);
//!             if attempts.get() == 1 {
//!                 Err(ProvisionError::ConfigValidationError { message: "boom".into() })
//!             } else {
//!                 Ok(42)
//!             }
//!         },
//!         || {
//!             repairs.set(repairs.get() + 1);
//!             Ok(())
//!         },
//!     )
//!     .unwrap();
//!
//! assert_eq!(value, 42);
//! assert_eq!(attempts.get(), 2);
//! assert_eq!(repairs.get(), 1);
//! assert!(autofix.is_spent());
//! ```

use crate::error::{ProvisionError, Result};

/// Single-use repair budget for a sequence of operations.
#[derive(Debug)]
pub struct Autofix {
    name: String,
    spent: bool,
}

impl Autofix {
    /// New budget for the workspace called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spent: false,
        }
    }

    /// Whether the repair has already been used.
    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Run `op`; on its first failure run `repair` and retry `op` once.
    ///
    /// A failing repair is returned as-is. A failing retry becomes
    /// [`ProvisionError::RepositoryRepairExhausted`].
    pub fn attempt<T, Op, Repair>(&mut self, operation: &str, mut op: Op, repair: Repair) -> Result<T>
    where
        Op: FnMut() -> Result<T>,
        Repair: FnOnce() -> Result<()>,
    {
        let first = match op() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if self.spent {
            return Err(first);
        }
        self.spent = true;

        tracing::warn!("{}: {operation} failed, attempting autofix...", self.name);
        tracing::debug!(error = %first, "failure before autofix");
        repair()?;

        op().map_err(|source| ProvisionError::RepositoryRepairExhausted {
            name: self.name.clone(),
            operation: operation.to_string(),
            source: Box::new(source),
        })
    }
}
