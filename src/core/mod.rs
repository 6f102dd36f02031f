//! Core OSAL modules
//!
//! Contains the context, scheduler, tasks, messages, timers and the
//! cross-domain dispatch proxy.

pub mod config;
pub mod critical;
pub mod error;
pub mod types;
pub mod kernel;
pub mod task;
pub mod sched;
pub mod msg;
pub mod timer;
pub mod proxy;
pub mod bridge;
pub mod cs_cell;
