use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic counter stamping each fetch-or-subscribe cycle.
///
/// Clones share the counter, so tasks spawned for a cycle can check whether
/// their stamp is still current before touching shared state.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Start a new cycle, invalidating every earlier stamp
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, stamp: u64) -> bool {
        self.current() == stamp
    }
}
