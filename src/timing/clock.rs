use std::time::Instant;

/// Time source for the race stopwatch. The session only ever looks at
/// millisecond deltas between readings, so the epoch is arbitrary.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic wall clock anchored at construction time.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Clock;
    use std::{cell::Cell, rc::Rc};

    /// Manually advanced clock shared between a test and the session under test.
    #[derive(Clone, Default)]
    pub(crate) struct FakeClock {
        now_ms: Rc<Cell<u64>>,
    }

    impl FakeClock {
        pub(crate) fn advance(&self, ms: u64) {
            self.now_ms.set(self.now_ms.get() + ms);
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.now_ms.get()
        }
    }
}
