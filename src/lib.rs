//! TI OSAL scheduling core in Rust
//!
//! A cooperative event-driven runtime for small MCUs providing:
//! - Strict index-priority task dispatch on 16-bit event masks
//! - Pool-backed inter-task message queue
//! - Software timers (one-shot and reloading)
//! - A dispatch proxy for messages crossing into a foreign domain

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod port;

// ============ Re-exports ============

pub use self::core::config;
pub use self::core::config::*;
pub use self::core::critical;
pub use self::core::error;
pub use self::core::error::{BridgeError, OsResult, OsalError};
pub use self::core::kernel;
pub use self::core::kernel::Osal;
pub use self::core::types;
pub use self::core::types::*;
pub use self::core::task;
pub use self::core::task::TaskDef;
pub use self::core::sched;
pub use self::core::msg;
pub use self::core::msg::{MsgPtr, MsgQueue};
pub use self::core::timer;
pub use self::core::proxy;
pub use self::core::proxy::Enrollment;
pub use self::core::bridge;
pub use self::core::bridge::{Bridge, BusyPoll, Clock, Domain, IdleHook, Inbound, MsgFormat};
