//! Orchestration-wide abort signal
//!
//! Aborting stops the driver from scheduling new components immediately;
//! a component already running finishes its current stage and then stops.
//! There is deliberately no mid-stage kill: interrupting a half-written
//! vendor lock or artifact would leave state that cannot be trusted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable abort flag shared between the driver and running lifecycles
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    flag: Arc<AtomicBool>,
}

impl AbortToken {
    /// Create a fresh, unsignalled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal abort
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether abort has been signalled
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
