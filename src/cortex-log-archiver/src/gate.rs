//! In-process single-flight guard for archive runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Guard that admits at most one archive run at a time.
///
/// The gate is binding within one process only; two processes archiving the
/// same directory are not coordinated.
#[derive(Debug, Default)]
pub struct CompactionGate {
    running: AtomicBool,
}

impl CompactionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the gate from idle to running.
    ///
    /// Returns `true` if this caller won the race. Every successful call must
    /// be paired with exactly one [`exit`](Self::exit).
    pub fn try_enter(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Reset the gate to idle.
    pub fn exit(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether an archive run currently holds the gate.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enter the gate and get a guard that exits it when dropped.
    pub fn enter(self: &Arc<Self>) -> Option<GateGuard> {
        if self.try_enter() {
            debug!("Entered archive gate");
            Some(GateGuard {
                gate: Arc::clone(self),
            })
        } else {
            None
        }
    }
}

/// Holds the [`CompactionGate`] until dropped.
#[derive(Debug)]
pub struct GateGuard {
    gate: Arc<CompactionGate>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.exit();
        debug!("Released archive gate");
    }
}
