//! Critical section handling for the OSAL
//!
//! Every mutation of the message pool, message queue and timer list runs with
//! interrupts masked. The guard below wraps `critical_section::acquire` so the
//! previous interrupt state is restored on drop, which makes nesting safe
//! (an ISR-side producer may already hold it when it calls into the OSAL).

/// RAII guard for critical sections
///
/// When this guard is created, interrupts are disabled.
/// When it is dropped, interrupts are restored to their previous state.
pub struct CriticalSection {
    restore: critical_section::RestoreState,
}

impl CriticalSection {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that will restore interrupt state when dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        // SAFETY: the matching release happens in Drop, in LIFO order
        // because the guard cannot outlive the scope that created it.
        let restore = unsafe { critical_section::acquire() };
        CriticalSection { restore }
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        // SAFETY: `restore` came from the acquire in `enter`.
        unsafe { critical_section::release(self.restore) };
    }
}

/// Execute a closure with interrupts disabled
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::core::cs_cell::CsCell)
/// protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}
