//! Software timer list
//!
//! Unordered singly linked list of relative countdowns, threaded through a
//! fixed pool of timer records. Each record targets one (task, event) pair.
//! Cancellation only marks the record; it is unlinked by the next `advance`.

use crate::config::CFG_TIMER_POOL_SIZE;
use crate::error::{OsResult, OsalError};
use crate::types::{EventMask, Millis, TaskId};

/// Index of a record in the timer pool
type Slot = u8;

/// Lifecycle of a timer record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Not linked, available for allocation
    Free,
    /// Linked and counting down
    Active,
    /// Cancelled, waiting to be reaped by the next advance
    PendingRemoval,
}

#[derive(Debug, Clone, Copy)]
struct TimerRec {
    next: Option<Slot>,
    timeout: Millis,
    task_id: TaskId,
    event_flag: EventMask,
    /// Reload period, 0 for one-shot
    reload: Millis,
    state: TimerState,
}

impl TimerRec {
    const FREE: TimerRec = TimerRec {
        next: None,
        timeout: 0,
        task_id: 0,
        event_flag: 0,
        reload: 0,
        state: TimerState::Free,
    };

    #[inline(always)]
    fn matches(&self, task_id: TaskId, event_flag: EventMask) -> bool {
        self.state == TimerState::Active && self.task_id == task_id && self.event_flag == event_flag
    }
}

/// List of armed timers
pub struct TimerList {
    recs: [TimerRec; CFG_TIMER_POOL_SIZE],
    head: Option<Slot>,
    tail: Option<Slot>,
    len: usize,
}

impl TimerList {
    pub const fn new() -> Self {
        TimerList {
            recs: [TimerRec::FREE; CFG_TIMER_POOL_SIZE],
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn iter(&self) -> impl Iterator<Item = Slot> + '_ {
        core::iter::successors(self.head, move |&s| self.recs[s as usize].next)
    }

    fn find(&self, task_id: TaskId, event_flag: EventMask) -> Option<Slot> {
        self.iter().find(|&s| self.recs[s as usize].matches(task_id, event_flag))
    }

    fn alloc(&mut self) -> Option<Slot> {
        let slot = self.recs.iter().position(|r| r.state == TimerState::Free)? as Slot;

        self.recs[slot as usize].state = TimerState::Active;
        match self.tail {
            Some(t) => self.recs[t as usize].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;
        Some(slot)
    }

    /// Arm a one-shot countdown, or restart the existing one for this pair
    ///
    /// A restarted timer keeps its reload period.
    pub fn arm(&mut self, task_id: TaskId, event_flag: EventMask, timeout: Millis) -> OsResult<()> {
        self.arm_slot(task_id, event_flag, timeout).map(|_| ())
    }

    /// Arm a countdown that re-arms itself with `timeout` on every expiry
    pub fn arm_reloading(&mut self, task_id: TaskId, event_flag: EventMask, timeout: Millis) -> OsResult<()> {
        let slot = self.arm_slot(task_id, event_flag, timeout)?;
        self.recs[slot as usize].reload = timeout;
        Ok(())
    }

    fn arm_slot(&mut self, task_id: TaskId, event_flag: EventMask, timeout: Millis) -> OsResult<Slot> {
        if let Some(slot) = self.find(task_id, event_flag) {
            self.recs[slot as usize].timeout = timeout;
            return Ok(slot);
        }

        let slot = self.alloc().ok_or(OsalError::NoTimerAvail)?;
        let rec = &mut self.recs[slot as usize];
        rec.next = None;
        rec.timeout = timeout;
        rec.task_id = task_id;
        rec.event_flag = event_flag;
        rec.reload = 0;
        Ok(slot)
    }

    /// Mark the timer for this pair for removal
    pub fn cancel(&mut self, task_id: TaskId, event_flag: EventMask) -> OsResult<()> {
        let slot = self.find(task_id, event_flag).ok_or(OsalError::InvalidEventId)?;
        let rec = &mut self.recs[slot as usize];
        rec.event_flag = 0;
        rec.state = TimerState::PendingRemoval;
        Ok(())
    }

    /// Remaining countdown, 0 when expired or not armed
    pub fn remaining(&self, task_id: TaskId, event_flag: EventMask) -> Millis {
        self.find(task_id, event_flag)
            .map_or(0, |s| self.recs[s as usize].timeout)
    }

    /// Subtract `elapsed` from every live countdown and process expiries
    ///
    /// `fire` is called once per expired timer with its task and event.
    /// Expired one-shots and cancelled records are unlinked and freed.
    pub fn advance(&mut self, elapsed: Millis, mut fire: impl FnMut(TaskId, EventMask)) {
        let mut prev: Option<Slot> = None;
        let mut cur = self.head;

        while let Some(slot) = cur {
            let rec = &mut self.recs[slot as usize];
            let next = rec.next;

            let remove = match rec.state {
                // No event to deliver; reap it like a cancelled record
                TimerState::Active if rec.event_flag == 0 => true,
                TimerState::Active => {
                    rec.timeout = rec.timeout.saturating_sub(elapsed);
                    if rec.timeout == 0 {
                        fire(rec.task_id, rec.event_flag);
                        if rec.reload != 0 {
                            rec.timeout = rec.reload;
                            false
                        } else {
                            true
                        }
                    } else {
                        false
                    }
                }
                TimerState::PendingRemoval => true,
                TimerState::Free => {
                    debug_assert!(false, "free timer record linked");
                    true
                }
            };

            if remove {
                match prev {
                    Some(p) => self.recs[p as usize].next = next,
                    None => self.head = next,
                }
                if self.tail == Some(slot) {
                    self.tail = prev;
                }
                self.recs[slot as usize] = TimerRec::FREE;
                self.len -= 1;
            } else {
                prev = Some(slot);
            }

            cur = next;
        }
    }

    /// Number of linked records, cancelled ones included until reaped
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Smallest countdown among live timers, 0 when none is armed
    pub fn next_deadline(&self) -> Millis {
        self.iter()
            .map(|s| &self.recs[s as usize])
            .filter(|r| r.state == TimerState::Active)
            .map(|r| r.timeout)
            .min()
            .unwrap_or(0)
    }
}

impl Default for TimerList {
    fn default() -> Self {
        Self::new()
    }
}
