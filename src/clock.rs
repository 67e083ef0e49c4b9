//! An injectable monotonic clock, so tests can drive timers deterministically
//! instead of sleeping on wall-clock time.

use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> Instant + Send + Sync>);

impl Clock {
    pub fn real() -> Self {
        Clock(Arc::new(Instant::now))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Instant + Send + Sync + 'static,
    {
        Clock(Arc::new(f))
    }

    pub fn now(&self) -> Instant {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::real()
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Clock(..)")
    }
}
