//! The transition gate: set while a self-triggered zone change is in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared handle to the transition flag.
///
/// The executor engages it when it commits to a portal click; only the grace
/// monitor (or the executor's own attempt ceiling) releases it. While engaged,
/// the control loop skips every transition-sensitive branch.
#[derive(Debug, Clone, Default)]
pub struct TransitionGate {
    engaged: Arc<AtomicBool>,
}

impl TransitionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the gate was previously open.
    pub fn engage(&self) -> bool {
        !self.engaged.swap(true, Ordering::AcqRel)
    }

    /// Returns true if the gate was previously engaged.
    pub fn release(&self) -> bool {
        self.engaged.swap(false, Ordering::AcqRel)
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }
}
