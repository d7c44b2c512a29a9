use std::time::Instant;

use time::OffsetDateTime;

/// Source of time for scheduling (monotonic) and for user-facing save stamps (wall clock).
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn now_utc(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use parking_lot::Mutex;
    use time::OffsetDateTime;

    use super::Clock;

    /// Clock that only moves when told to.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        state: Arc<Mutex<(Instant, OffsetDateTime)>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new((
                    Instant::now(),
                    time::macros::datetime!(2025-09-08 10:00 UTC),
                ))),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut state = self.state.lock();
            state.0 += by;
            state.1 += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.state.lock().0
        }

        fn now_utc(&self) -> OffsetDateTime {
            self.state.lock().1
        }
    }
}
