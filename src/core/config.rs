//! Compile-time configuration for the OSAL core
//!
//! These constants size the static tables and pools. Nothing here is
//! allocated dynamically; exceeding a limit is reported as an allocation
//! failure or, for the proxy table, a fatal error.

/// Maximum number of tasks a context can register
pub const CFG_TASKS_MAX: usize = 16;

/// Number of message buffers in the message pool
pub const CFG_MSG_POOL_SIZE: usize = 32;

/// Largest payload a single message can carry, in bytes
pub const CFG_MSG_PAYLOAD_MAX: usize = 64;

/// Number of software timer records
pub const CFG_TIMER_POOL_SIZE: usize = 16;

/// Number of foreign senders the dispatch proxy can stand in for
pub const CFG_PROXY_MAX: usize = 4;

/// SysTick rate used by the Cortex-M clock port, in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;
