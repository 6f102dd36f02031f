//! Cortex-M SysTick clock and WFI idle

use cortex_m::peripheral::syst::SystClkSource;
use portable_atomic::{AtomicU32, Ordering};

use crate::bridge::{Clock, IdleHook};
use crate::config::CFG_TICK_RATE_HZ;

static TICKS: AtomicU32 = AtomicU32::new(0);

/// SysTick interrupts since `SysTickClock::start`
#[inline]
pub fn systick_ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

#[cortex_m_rt::exception]
fn SysTick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// OSAL clock backed by the SysTick exception at `CFG_TICK_RATE_HZ`
pub struct SysTickClock {
    core_hz: u32,
}

impl SysTickClock {
    pub const fn new(core_hz: u32) -> Self {
        SysTickClock { core_hz }
    }

    /// Program and start SysTick
    ///
    /// # Example
    /// For a 16MHz core at 1000Hz the reload is 16_000 - 1.
    pub fn start(&self) {
        // SAFETY: only SYST is touched, and only from here
        let mut p = unsafe { cortex_m::Peripherals::steal() };
        let cnts = self.core_hz / CFG_TICK_RATE_HZ;

        p.SYST.set_reload(cnts - 1);
        p.SYST.clear_current();
        p.SYST.set_clock_source(SystClkSource::Core);
        p.SYST.enable_interrupt();
        p.SYST.enable_counter();
    }
}

impl Clock for SysTickClock {
    #[inline]
    fn ticks(&self) -> u32 {
        systick_ticks()
    }

    #[inline]
    fn tick_period_us(&self) -> u32 {
        1_000_000 / CFG_TICK_RATE_HZ
    }
}

/// Sleep until the next interrupt
#[derive(Debug, Default, Clone, Copy)]
pub struct WfiIdle;

impl IdleHook for WfiIdle {
    #[inline]
    fn idle(&self) {
        cortex_m::asm::wfi();
    }
}
