//! Scheduler core
//!
//! Cooperative and strictly prioritized: a pass dispatches the lowest-indexed
//! task with pending events, runs its handler to completion and folds back
//! whatever events the handler left unprocessed. Nothing preempts a handler;
//! ISRs and foreign domains only set events and queue messages.

use crate::bridge::{Bridge, Domain};
use crate::config::CFG_MSG_PAYLOAD_MAX;
use crate::error::{OsResult, OsalError};
use crate::kernel::Osal;
use crate::types::TaskId;

impl Osal<'_> {
    /// Run one scheduler pass
    ///
    /// Drains inbound cross-domain messages, advances the timers and
    /// dispatches at most one task.
    ///
    /// # Returns
    /// * `Ok(Some(id))` - Task `id` was dispatched
    /// * `Ok(None)` - No task was ready
    /// * `Err(OsalError::NotInitialized)` - `init_system` has not run
    pub fn run_system(&self) -> OsResult<Option<TaskId>> {
        if !self.is_initialized() {
            return Err(OsalError::NotInitialized);
        }

        if let Some(bridge) = self.domain.bridge() {
            self.drain_inbound(bridge);
        }

        self.time_update();

        let Some(task_id) = self.events.highest_ready(self.task_limit()) else {
            if let Domain::Standalone(idle) = self.domain {
                idle.idle();
            }
            return Ok(None);
        };

        let events = self.events.take(task_id);
        crate::trace!("dispatch task {} events {}", task_id, events);

        self.enter_task(task_id);
        let rest = (self.tasks[task_id as usize].handler)(self, task_id, events);
        self.leave_task();

        if rest != 0 {
            self.events.set(task_id, rest);
        }
        Ok(Some(task_id))
    }

    /// Run the scheduler forever
    ///
    /// With a bridge the whole domain blocks between passes until the next
    /// timer deadline or a signal.
    ///
    /// # Panics
    /// When called before `init_system`.
    pub fn start_system(&self) -> ! {
        crate::info!("osal scheduler start");
        loop {
            match self.run_system() {
                Ok(Some(_)) => {}
                Ok(None) => self.wait_for_work(),
                Err(e) => crate::fatal!("scheduler failed: {}", e as u8),
            }
        }
    }

    /// Block on the bridge until a deadline or signal
    pub(crate) fn wait_for_work(&self) {
        if let Some(bridge) = self.domain.bridge() {
            let next = self.next_timeout();
            if next != 0 {
                bridge.set_alarm(next);
            }
            bridge.wait();
        }
    }

    /// Turn every pending inbound message into a local one
    fn drain_inbound(&self, bridge: &dyn Bridge) {
        let mut buf = [0u8; CFG_MSG_PAYLOAD_MAX];

        while let Some(inb) = bridge.fetch(&mut buf) {
            if inb.len > buf.len() {
                crate::error!("inbound from {} too long: {}", inb.src, inb.len);
                continue;
            }

            let proxy = self.alien_to_proxy(inb.src);
            let dest = match self.dispatch_to_task(inb.dst) {
                Some(t) => t,
                None => crate::fatal!("inbound for unknown entity {}", inb.dst),
            };

            let payload = &mut buf[..inb.len];
            if let Some(off) = inb.format.sender_offset() {
                if let Some(b) = payload.get_mut(off) {
                    *b = proxy;
                }
            }

            let Some(msg) = self.msg_allocate(inb.len) else {
                crate::error!("inbound from {} dropped, no buffer", inb.src);
                continue;
            };

            if let Err(e) = self.msg_write(msg, payload).and_then(|_| self.msg_send(dest, msg)) {
                crate::error!("inbound delivery to task {} failed: {}", dest, e as u8);
            }
        }
    }
}
