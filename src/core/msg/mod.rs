//! Inter-task messages
//!
//! Messages are allocated from the context's pool, filled by the sender and
//! queued on the context's single message queue tagged with a destination
//! task. Queuing a message sets `SYS_EVENT_MSG` on the destination; the task
//! drains its messages with [`Osal::msg_receive`] and frees each one.
//!
//! A destination carrying `PROXY_ID_FLAG` names a foreign entity; such sends
//! are handed to the dispatch proxy instead of the local queue.

mod pool;
mod queue;

pub use pool::{MsgPool, MsgPtr};
pub use queue::{Iter, MsgQueue};

use crate::config::CFG_MSG_PAYLOAD_MAX;
use crate::critical::critical_section;
use crate::error::{OsResult, OsalError};
use crate::kernel::Osal;
use crate::types::event::{MSG_EVENT_ANY, SYS_EVENT_MSG};
use crate::types::id::{is_proxy, TASK_USER_QUEUE};
use crate::types::TaskId;

impl Osal<'_> {
    /// Allocate a message with a `len` byte zeroed payload
    ///
    /// Returns `None` when the pool is exhausted or `len` is larger than
    /// `CFG_MSG_PAYLOAD_MAX`.
    pub fn msg_allocate(&self, len: usize) -> Option<MsgPtr> {
        let msg = critical_section(|cs| self.state.get(cs).msgs.allocate(len));
        if msg.is_none() {
            crate::warn!("msg alloc of {} bytes failed", len);
        }
        msg
    }

    /// Free a message
    ///
    /// # Returns
    /// * `Err(OsalError::InvalidMsgPointer)` - Not a live message
    /// * `Err(OsalError::MsgBufferNotAvail)` - Message is still queued
    pub fn msg_deallocate(&self, msg: MsgPtr) -> OsResult<()> {
        critical_section(|cs| self.state.get(cs).msgs.deallocate(msg))
    }

    /// Send a message to a task, appending it to the queue
    ///
    /// On `InvalidTask` and `InvalidMsgPointer` the message is freed (when it
    /// can be), so the caller must not touch it again.
    pub fn msg_send(&self, dest: TaskId, msg: MsgPtr) -> OsResult<()> {
        self.msg_enqueue_push(dest, msg, false)
    }

    /// Send a message ahead of everything already queued
    pub fn msg_push_front(&self, dest: TaskId, msg: MsgPtr) -> OsResult<()> {
        self.msg_enqueue_push(dest, msg, true)
    }

    fn msg_enqueue_push(&self, dest: TaskId, msg: MsgPtr, push: bool) -> OsResult<()> {
        if is_proxy(dest) {
            let alien = critical_section(|cs| self.state.get(cs).proxy.proxy_to_alien(dest));
            return self.send_across_domain(self.self_id(), alien, msg);
        }

        if self.check_task(dest).is_err() {
            let _ = self.msg_deallocate(msg);
            return Err(OsalError::InvalidTask);
        }

        critical_section(|cs| {
            let st = self.state.get(cs);

            if !is_fresh(&st.msgs, msg) {
                let _ = st.msgs.deallocate(msg);
                return Err(OsalError::InvalidMsgPointer);
            }

            if push {
                st.queue.insert_head(&mut st.msgs, msg, dest);
            } else {
                st.queue.insert_tail(&mut st.msgs, msg, dest);
            }
            Ok(())
        })?;

        self.set_event(dest, SYS_EVENT_MSG)
    }

    /// Take the oldest message queued for `task_id`
    ///
    /// `SYS_EVENT_MSG` stays set on the task while more of its messages are
    /// queued and is cleared once the last one is taken.
    pub fn msg_receive(&self, task_id: TaskId) -> Option<MsgPtr> {
        critical_section(|cs| {
            let st = self.state.get(cs);

            let found = st.queue.find_for(&st.msgs, task_id);
            let more = st
                .queue
                .iter(&st.msgs)
                .filter(|&m| st.msgs.hdr(m).is_some_and(|h| h.dest_id == task_id))
                .nth(1)
                .is_some();

            if (task_id as usize) < self.task_limit() {
                if more {
                    self.events.set(task_id, SYS_EVENT_MSG);
                } else {
                    self.events.clear(task_id, SYS_EVENT_MSG);
                }
            }

            found.map(|(prev, m)| {
                st.queue.extract(&mut st.msgs, m, prev);
                m
            })
        })
    }

    /// First message queued for `task_id` with event code `event`
    ///
    /// The message stays queued.
    pub fn msg_find(&self, task_id: TaskId, event: u8) -> Option<MsgPtr> {
        critical_section(|cs| {
            let st = self.state.get(cs);
            st.queue.iter(&st.msgs).find(|&m| {
                st.msgs.hdr(m).is_some_and(|h| h.dest_id == task_id) && st.msgs.event(m) == event
            })
        })
    }

    /// Count messages queued for `task_id` with event code `event`
    ///
    /// `MSG_EVENT_ANY` counts every message for the task.
    pub fn msg_count(&self, task_id: TaskId, event: u8) -> usize {
        critical_section(|cs| {
            let st = self.state.get(cs);
            st.queue
                .iter(&st.msgs)
                .filter(|&m| {
                    st.msgs.hdr(m).is_some_and(|h| h.dest_id == task_id)
                        && (event == MSG_EVENT_ANY || st.msgs.event(m) == event)
                })
                .count()
        })
    }

    /// Payload length of a live message
    pub fn msg_len(&self, msg: MsgPtr) -> OsResult<usize> {
        critical_section(|cs| {
            self.state
                .get(cs)
                .msgs
                .data(msg)
                .map(|d| d.len())
                .ok_or(OsalError::InvalidMsgPointer)
        })
    }

    /// Copy `data` to the start of the payload
    pub fn msg_write(&self, msg: MsgPtr, data: &[u8]) -> OsResult<()> {
        self.with_msg(msg, |payload| {
            let dst = payload.get_mut(..data.len()).ok_or(OsalError::InvalidParameter)?;
            dst.copy_from_slice(data);
            Ok(())
        })?
    }

    /// Copy the payload into `out`, returning the number of bytes copied
    pub fn msg_read(&self, msg: MsgPtr, out: &mut [u8]) -> OsResult<usize> {
        self.with_msg(msg, |payload| {
            let n = payload.len().min(out.len());
            out[..n].copy_from_slice(&payload[..n]);
            n
        })
    }

    /// Run `f` on the payload inside a critical section
    ///
    /// `f` must not call back into this context.
    pub fn with_msg<R>(&self, msg: MsgPtr, f: impl FnOnce(&mut [u8]) -> R) -> OsResult<R> {
        critical_section(|cs| {
            let payload = self.state.get(cs).msgs.data_mut(msg).ok_or(OsalError::InvalidMsgPointer)?;
            Ok(f(payload))
        })
    }

    /// Number of free message buffers
    pub fn msg_available(&self) -> usize {
        critical_section(|cs| self.state.get(cs).msgs.available())
    }

    /// Append a message to a caller-owned queue
    ///
    /// The message must be unqueued; while linked it cannot be freed or sent.
    pub fn msg_enqueue(&self, q: &mut MsgQueue, msg: MsgPtr) -> OsResult<()> {
        critical_section(|cs| {
            let st = self.state.get(cs);
            if !is_fresh(&st.msgs, msg) {
                return Err(OsalError::InvalidMsgPointer);
            }
            q.insert_tail(&mut st.msgs, msg, TASK_USER_QUEUE);
            Ok(())
        })
    }

    /// Append a message unless the queue already holds `max` messages
    ///
    /// Returns `Ok(false)` when the queue is full; the message is untouched.
    pub fn msg_enqueue_max(&self, q: &mut MsgQueue, msg: MsgPtr, max: usize) -> OsResult<bool> {
        critical_section(|cs| {
            let st = self.state.get(cs);
            if q.len(&st.msgs) >= max {
                return Ok(false);
            }
            if !is_fresh(&st.msgs, msg) {
                return Err(OsalError::InvalidMsgPointer);
            }
            q.insert_tail(&mut st.msgs, msg, TASK_USER_QUEUE);
            Ok(true)
        })
    }

    /// Insert a message at the head of a caller-owned queue
    pub fn msg_push(&self, q: &mut MsgQueue, msg: MsgPtr) -> OsResult<()> {
        critical_section(|cs| {
            let st = self.state.get(cs);
            if !is_fresh(&st.msgs, msg) {
                return Err(OsalError::InvalidMsgPointer);
            }
            q.insert_head(&mut st.msgs, msg, TASK_USER_QUEUE);
            Ok(())
        })
    }

    /// Take the head of a caller-owned queue
    pub fn msg_dequeue(&self, q: &mut MsgQueue) -> Option<MsgPtr> {
        critical_section(|cs| {
            let st = self.state.get(cs);
            q.remove_head(&mut st.msgs)
        })
    }

    /// Unlink `msg` from anywhere in a caller-owned queue
    ///
    /// `prev` is the message before it, `None` to have it looked up.
    pub fn msg_extract(&self, q: &mut MsgQueue, msg: MsgPtr, prev: Option<MsgPtr>) -> OsResult<()> {
        critical_section(|cs| {
            let st = self.state.get(cs);
            if !q.iter(&st.msgs).any(|m| m == msg) {
                return Err(OsalError::InvalidMsgPointer);
            }
            let prev = prev.or_else(|| q.prev_of(&st.msgs, msg));
            q.extract(&mut st.msgs, msg, prev);
            Ok(())
        })
    }

    /// Messages waiting on a caller-owned queue
    pub fn msg_queue_len(&self, q: &MsgQueue) -> usize {
        critical_section(|cs| q.len(&self.state.get(cs).msgs))
    }
}

/// Live and not linked into any queue
#[inline]
fn is_fresh(pool: &MsgPool, msg: MsgPtr) -> bool {
    pool.hdr(msg).is_some_and(|h| h.is_unqueued())
}

const _: () = assert!(CFG_MSG_PAYLOAD_MAX <= u16::MAX as usize);
