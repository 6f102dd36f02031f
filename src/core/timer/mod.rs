//! Software timers and system time
//!
//! A timer sets an event on a task when its countdown reaches zero. Each
//! (task, event) pair has at most one timer: starting it again restarts the
//! countdown. Countdowns are advanced by the scheduler from the context's
//! [`Clock`](crate::bridge::Clock), in whole milliseconds.

mod list;

pub use list::{TimerList, TimerState};

use crate::critical::critical_section;
use crate::error::OsResult;
use crate::kernel::Osal;
use crate::types::{EventMask, Millis, TaskId};

impl Osal<'_> {
    /// Start a one-shot timer
    ///
    /// # Returns
    /// * `Err(OsalError::InvalidTask)` - No such task
    /// * `Err(OsalError::NoTimerAvail)` - Timer pool exhausted
    pub fn start_timer(&self, task_id: TaskId, event_flag: EventMask, timeout: Millis) -> OsResult<()> {
        self.check_task(task_id)?;
        critical_section(|cs| self.state.get(cs).timers.arm(task_id, event_flag, timeout))
    }

    /// Start a timer that re-arms itself with `timeout` every time it fires
    pub fn start_reload_timer(&self, task_id: TaskId, event_flag: EventMask, timeout: Millis) -> OsResult<()> {
        self.check_task(task_id)?;
        critical_section(|cs| {
            self.state.get(cs).timers.arm_reloading(task_id, event_flag, timeout)
        })
    }

    /// Stop the timer for this (task, event) pair
    ///
    /// # Returns
    /// * `Err(OsalError::InvalidEventId)` - No such timer running
    pub fn stop_timer(&self, task_id: TaskId, event_flag: EventMask) -> OsResult<()> {
        critical_section(|cs| self.state.get(cs).timers.cancel(task_id, event_flag))
    }

    /// Milliseconds left on the timer for this pair
    ///
    /// 0 means either that no such timer runs or that it expires on the next
    /// update; callers cannot tell the two apart.
    pub fn get_timeout(&self, task_id: TaskId, event_flag: EventMask) -> Millis {
        critical_section(|cs| self.state.get(cs).timers.remaining(task_id, event_flag))
    }

    /// Timer records in use, stopped timers included until reaped
    pub fn timer_num_active(&self) -> usize {
        critical_section(|cs| self.state.get(cs).timers.len())
    }

    /// Shortest countdown among running timers, 0 when none runs
    pub fn next_timeout(&self) -> Millis {
        critical_section(|cs| self.state.get(cs).timers.next_deadline())
    }

    /// Advance every timer by `elapsed` milliseconds and fire expiries
    ///
    /// The scheduler calls this itself; an application driving time by hand
    /// (a test, or a port without a clock) may call it directly.
    pub fn timer_update(&self, elapsed: Millis) {
        critical_section(|cs| {
            let st = self.state.get(cs);
            st.time.system_ms = st.time.system_ms.wrapping_add(elapsed);
            st.timers.advance(elapsed, |task_id, event_flag| {
                if (task_id as usize) < self.task_limit() {
                    self.events.set(task_id, event_flag);
                }
            });
        });
    }

    /// Milliseconds since `init_system`
    pub fn system_clock(&self) -> Millis {
        critical_section(|cs| self.state.get(cs).time.system_ms)
    }

    /// Convert the ticks since the last call into milliseconds and advance
    ///
    /// Sub-millisecond remainders carry over to the next call so no time is
    /// lost. Runs even when no whole millisecond has passed so zero-length
    /// timers fire and stopped ones are reaped.
    pub(crate) fn time_update(&self) {
        let now = self.clock.ticks();
        let period = self.clock.tick_period_us() as u64;

        let elapsed = critical_section(|cs| {
            let time = &mut self.state.get(cs).time;
            let delta = now.wrapping_sub(time.last_ticks) as u64;
            let us = delta * period + time.rem_us as u64;
            time.last_ticks = now;
            time.rem_us = (us % 1000) as u32;
            (us / 1000).min(Millis::MAX as u64) as Millis
        });

        if elapsed != 0 {
            crate::trace!("time +{} ms", elapsed);
        }
        self.timer_update(elapsed);
    }
}
