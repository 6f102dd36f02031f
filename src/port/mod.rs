//! Port layer - clock and idle implementations for the scheduler
//!
//! On Cortex-M the SysTick counter drives the OSAL clock and the idle hook
//! sleeps with `WFI`. Host builds get a hand-driven clock for tests.

#[cfg(target_arch = "arm")]
pub mod systick;

#[cfg(target_arch = "arm")]
pub use systick::*;

// Stub implementations for non-ARM targets (for testing)
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    use portable_atomic::{AtomicU32, Ordering};

    use crate::bridge::Clock;

    /// Clock that only moves when told to
    pub struct ManualClock {
        ticks: AtomicU32,
        period_us: u32,
    }

    impl ManualClock {
        pub const fn new(period_us: u32) -> Self {
            ManualClock { ticks: AtomicU32::new(0), period_us }
        }

        /// Move the counter forward by `n` ticks, wrapping like hardware
        pub fn advance(&self, n: u32) {
            // fetch_add wraps on overflow
            self.ticks.fetch_add(n, Ordering::SeqCst);
        }

        pub fn set(&self, ticks: u32) {
            self.ticks.store(ticks, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn ticks(&self) -> u32 {
            self.ticks.load(Ordering::SeqCst)
        }

        fn tick_period_us(&self) -> u32 {
            self.period_us
        }
    }
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
