//! Task table
//!
//! Tasks are static: a name, an optional init hook and an event handler,
//! registered once when the context is built. Each task owns a 16-bit pending
//! event mask that any context (ISR included) may set or clear.

use portable_atomic::{AtomicU16, Ordering};

use crate::config::CFG_TASKS_MAX;
use crate::kernel::Osal;
use crate::types::{EventMask, TaskId};

/// Init hook, called once from `init_system` with the task's own ID
pub type TaskInitFn = fn(&Osal<'_>, TaskId);

/// Event handler
///
/// Receives the events pending when it was dispatched and returns the bits
/// it did not handle; those are put back so the task runs again.
pub type TaskEventFn = fn(&Osal<'_>, TaskId, EventMask) -> EventMask;

/// Static task descriptor
#[derive(Clone, Copy)]
pub struct TaskDef {
    /// Task name for debugging
    pub name: &'static str,
    pub init: Option<TaskInitFn>,
    pub handler: TaskEventFn,
}

impl TaskDef {
    pub const fn new(name: &'static str, handler: TaskEventFn) -> Self {
        TaskDef { name, init: None, handler }
    }

    pub const fn with_init(mut self, init: TaskInitFn) -> Self {
        self.init = Some(init);
        self
    }
}

/// Pending event masks, one per task slot
pub struct EventTable {
    bits: [AtomicU16; CFG_TASKS_MAX],
}

impl EventTable {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const NONE: AtomicU16 = AtomicU16::new(0);
        EventTable { bits: [NONE; CFG_TASKS_MAX] }
    }

    pub fn reset(&self) {
        for b in self.bits.iter() {
            b.store(0, Ordering::SeqCst);
        }
    }

    /// OR `events` into the task's mask
    #[inline]
    pub fn set(&self, task_id: TaskId, events: EventMask) {
        self.bits[task_id as usize].fetch_or(events, Ordering::AcqRel);
    }

    /// Clear `events` from the task's mask
    #[inline]
    pub fn clear(&self, task_id: TaskId, events: EventMask) {
        self.bits[task_id as usize].fetch_and(!events, Ordering::AcqRel);
    }

    /// Snapshot and zero the task's mask in one step
    #[inline]
    pub fn take(&self, task_id: TaskId) -> EventMask {
        self.bits[task_id as usize].swap(0, Ordering::AcqRel)
    }

    #[inline]
    pub fn pending(&self, task_id: TaskId) -> EventMask {
        self.bits[task_id as usize].load(Ordering::Acquire)
    }

    /// Lowest task index below `count` with pending events
    pub fn highest_ready(&self, count: usize) -> Option<TaskId> {
        self.bits[..count]
            .iter()
            .position(|b| b.load(Ordering::Acquire) != 0)
            .map(|i| i as TaskId)
    }
}

impl Default for EventTable {
    fn default() -> Self {
        Self::new()
    }
}
