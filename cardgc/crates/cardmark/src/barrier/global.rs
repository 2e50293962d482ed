//! Global Barrier Set - process-wide installation
//!
//! The runtime installs exactly one barrier set during heap initialization.
//! Compiled code, the interpreter and the collector all retrieve it from
//! here.

use super::BarrierSet;
use crate::error::{BarrierError, Result};
use parking_lot::RwLock;
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref BARRIER_SET: RwLock<Option<Arc<dyn BarrierSet>>> = RwLock::new(None);
}

/// Install the process-wide barrier set
///
/// # Errors
/// `AlreadyInstalled` if a barrier set was installed before.
pub fn set_barrier_set(barrier: Arc<dyn BarrierSet>) -> Result<()> {
    let mut slot = BARRIER_SET.write();
    if let Some(existing) = slot.as_ref() {
        return Err(BarrierError::AlreadyInstalled(existing.name().to_string()));
    }
    log::debug!("installing {} barrier set", barrier.name());
    *slot = Some(barrier);
    Ok(())
}

/// The process-wide barrier set
///
/// # Errors
/// `NotInstalled` before [`set_barrier_set`] succeeded.
pub fn barrier_set() -> Result<Arc<dyn BarrierSet>> {
    BARRIER_SET.read().clone().ok_or(BarrierError::NotInstalled)
}

/// Check whether a barrier set is installed
pub fn is_installed() -> bool {
    BARRIER_SET.read().is_some()
}
