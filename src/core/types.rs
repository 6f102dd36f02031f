//! Core type definitions for the OSAL
//!
//! Plain integer aliases mirror the on-wire sizes used by the BLE stack.

/// Task identifier (index into the task table)
pub type TaskId = u8;

/// Per-task pending event bitmask
pub type EventMask = u16;

/// Identifier of an entity in a foreign domain
pub type EntityId = u8;

/// Milliseconds
pub type Millis = u32;

/// Message payload length
pub type MsgLen = u16;

/// Reserved task identifiers
pub mod id {
    use super::TaskId;

    /// "No task": the destination of a message that is not queued, and the
    /// active task outside of dispatch
    pub const TASK_NO_TASK: TaskId = 0xFF;

    /// Tag of a message sitting in a caller-owned [`MsgQueue`](crate::msg::MsgQueue)
    pub const TASK_USER_QUEUE: TaskId = 0xFE;

    /// High bit marking a proxy task ID that stands in for a foreign entity
    pub const PROXY_ID_FLAG: TaskId = 0x80;

    /// Check whether `id` is a proxy task ID
    #[inline(always)]
    pub const fn is_proxy(id: TaskId) -> bool {
        id != TASK_NO_TASK && id != TASK_USER_QUEUE && (id & PROXY_ID_FLAG) != 0
    }
}

/// Reserved event bits and message event codes
pub mod event {
    use super::EventMask;

    /// Set on a task whenever a message is waiting for it
    pub const SYS_EVENT_MSG: EventMask = 0x8000;

    /// Wildcard for [`Osal::msg_count`](crate::Osal::msg_count)
    pub const MSG_EVENT_ANY: u8 = 0xFF;
}
