//! Dispatch proxy layer
//!
//! Bridges local task IDs and foreign entity IDs so messages can cross into
//! other domains through the context's [`Bridge`](crate::bridge::Bridge).
//! Enrollment happens at startup; proxy IDs for foreign senders are handed
//! out as their first message arrives.

mod table;

pub use table::{Enrollment, ProxyTable};

use crate::bridge::MsgFormat;
use crate::config::CFG_MSG_PAYLOAD_MAX;
use crate::critical::critical_section;
use crate::error::{OsResult, OsalError};
use crate::kernel::Osal;
use crate::msg::MsgPtr;
use crate::types::{EntityId, TaskId};

impl Osal<'_> {
    /// Enroll a task that sends and receives as `entity`
    pub fn enroll_dispatch_id(&self, task_id: TaskId, entity: EntityId) -> OsResult<()> {
        self.check_task(task_id)?;
        critical_section(|cs| self.state.get(cs).proxy.enroll_dispatch(task_id, entity));
        Ok(())
    }

    /// Enroll a task that only sends, as `entity`
    ///
    /// Enrolling the same task again with [`Osal::enroll_dispatch_id`]
    /// afterwards is not a supported configuration.
    pub fn enroll_sender_id(&self, task_id: TaskId, entity: EntityId) -> OsResult<()> {
        self.check_task(task_id)?;
        critical_section(|cs| self.state.get(cs).proxy.enroll_sender(task_id, entity));
        Ok(())
    }

    /// Identity for sends made outside any task
    pub fn enroll_notask_sender(&self, entity: EntityId) {
        critical_section(|cs| self.state.get(cs).proxy.enroll_notask(entity));
    }

    /// Proxy task ID standing for a foreign sender
    ///
    /// # Panics
    /// When the proxy table is full.
    pub fn alien_to_proxy(&self, alien: EntityId) -> TaskId {
        critical_section(|cs| self.state.get(cs).proxy.alien_to_proxy(alien))
    }

    /// Foreign entity behind a proxy task ID
    ///
    /// # Panics
    /// When `proxy` is not a mapped proxy ID.
    pub fn proxy_to_alien(&self, proxy: TaskId) -> EntityId {
        critical_section(|cs| self.state.get(cs).proxy.proxy_to_alien(proxy))
    }

    /// Local task enrolled to receive for `entity`
    pub fn dispatch_to_task(&self, entity: EntityId) -> Option<TaskId> {
        critical_section(|cs| self.state.get(cs).proxy.dispatch_to_task(entity))
    }

    pub fn enrollment(&self, task_id: TaskId) -> Enrollment {
        critical_section(|cs| self.state.get(cs).proxy.enrollment(task_id))
    }

    /// Hand a message to the foreign entity `dst`
    ///
    /// The sender identity is the enrollment of `src_task`, or the no-task
    /// sender for `TASK_NO_TASK`. The local message is consumed whether or
    /// not the transport accepts it.
    ///
    /// # Returns
    /// * `Err(OsalError::InvalidMsgPointer)` - `msg` is not a fresh message
    /// * `Err(OsalError::Failure)` - No bridge, or the transport refused
    ///
    /// # Panics
    /// When `src_task` has no sender identity.
    pub fn send_across_domain(&self, src_task: TaskId, dst: EntityId, msg: MsgPtr) -> OsResult<()> {
        let bridge = match self.domain.bridge() {
            Some(b) => b,
            None => {
                crate::error!("cross-domain send without a bridge");
                let _ = self.msg_deallocate(msg);
                return Err(OsalError::Failure);
            }
        };

        let mut buf = [0u8; CFG_MSG_PAYLOAD_MAX];
        let (src, len) = critical_section(|cs| {
            let st = self.state.get(cs);
            let src = st.proxy.sender_of(src_task);
            let len = match st.msgs.hdr(msg) {
                Some(hdr) if hdr.is_unqueued() => st.msgs.data(msg).map_or(0, |d| {
                    buf[..d.len()].copy_from_slice(d);
                    d.len()
                }),
                _ => return Err(OsalError::InvalidMsgPointer),
            };
            let _ = st.msgs.deallocate(msg);
            Ok((src, len))
        })?;

        let src = match src {
            Some(e) => e,
            None => crate::fatal!("task {} has no dispatch id", src_task),
        };

        bridge.send(src, dst, MsgFormat::Keep, &buf[..len]).map_err(|e| {
            crate::warn!("bridge send {} -> {} failed: {}", src, dst, e as i8);
            OsalError::Failure
        })
    }
}
