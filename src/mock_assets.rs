use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

/// Manually driven clock with microsecond resolution
pub struct MockClock(AtomicU64);

impl MockClock {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn now(&self) -> Duration {
        Duration::from_micros(self.0.load(Ordering::SeqCst))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute reading, possibly backwards
    pub fn set(&self, to: Duration) {
        self.0.store(to.as_micros() as u64, Ordering::SeqCst);
    }
}
