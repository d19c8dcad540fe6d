use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Run-wide accumulator shared by every host task and every export unit.
/// The failure counter doubles as the cooperative stop flag: once it is
/// nonzero, units skip their remaining statements and host tasks stop
/// picking up new tables.
#[derive(Debug, Default)]
pub struct RunStats {
    estimated_bytes: AtomicU64,
    failed_units: AtomicU32,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_estimated_bytes(&self, bytes: u64) {
        self.estimated_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_units.fetch_add(1, Ordering::SeqCst);
    }

    /// True once any unit or planning step has failed.
    pub fn has_failures(&self) -> bool {
        self.failed_units.load(Ordering::SeqCst) != 0
    }

    pub fn estimated_bytes(&self) -> u64 {
        self.estimated_bytes.load(Ordering::Relaxed)
    }

    pub fn failed_units(&self) -> u32 {
        self.failed_units.load(Ordering::SeqCst)
    }
}
