// src/stop.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Run-wide stop flag shared by the controller and the transport worker.
///
/// Set-once: nothing ever clears it within a run.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
