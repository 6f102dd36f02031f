//! OSAL context and initialization
//!
//! One [`Osal`] value is one cooperative domain: its task table, event masks,
//! message pool and queue, timer list and proxy tables. Applications usually
//! keep it in a `static`; tests build as many independent ones as they need.
//!
//! `init_system` must run once before any other entry point. There is no
//! teardown: the device runs until reset.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::bridge::{Clock, Domain};
use crate::config::CFG_TASKS_MAX;
use crate::critical::{critical_section, is_isr_context};
use crate::core::cs_cell::CsCell;
use crate::error::{OsResult, OsalError};
use crate::msg::{MsgPool, MsgQueue};
use crate::proxy::ProxyTable;
use crate::task::{EventTable, TaskDef};
use crate::timer::TimerList;
use crate::types::id::{PROXY_ID_FLAG, TASK_NO_TASK};
use crate::types::{EventMask, Millis, TaskId};

/// Millisecond bookkeeping between scheduler passes
pub(crate) struct TimeBase {
    /// Tick count at the last update
    pub(crate) last_ticks: u32,
    /// Microseconds not yet converted into a whole millisecond
    pub(crate) rem_us: u32,
    /// Milliseconds since `init_system`
    pub(crate) system_ms: Millis,
}

impl TimeBase {
    const fn new() -> Self {
        TimeBase { last_ticks: 0, rem_us: 0, system_ms: 0 }
    }
}

/// State mutated only inside critical sections
pub(crate) struct OsalState {
    pub(crate) msgs: MsgPool,
    pub(crate) queue: MsgQueue,
    pub(crate) timers: TimerList,
    pub(crate) proxy: ProxyTable,
    pub(crate) time: TimeBase,
}

impl OsalState {
    const fn new() -> Self {
        OsalState {
            msgs: MsgPool::new(),
            queue: MsgQueue::new(),
            timers: TimerList::new(),
            proxy: ProxyTable::new(),
            time: TimeBase::new(),
        }
    }

    fn reset(&mut self, now: u32) {
        self.msgs.reset();
        self.queue = MsgQueue::new();
        self.timers.reset();
        self.proxy.reset();
        self.time = TimeBase { last_ticks: now, ..TimeBase::new() };
    }
}

/// A cooperative scheduling domain
pub struct Osal<'a> {
    pub(crate) tasks: &'a [TaskDef],
    pub(crate) events: EventTable,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) domain: Domain<'a>,
    pub(crate) state: CsCell<OsalState>,
    initialized: AtomicBool,
    active: AtomicU8,
}

impl<'a> Osal<'a> {
    /// Build a context
    ///
    /// `tasks` is the static task table; a task's ID is its index, so lower
    /// indices are dispatched first.
    pub const fn new(tasks: &'a [TaskDef], clock: &'a dyn Clock, domain: Domain<'a>) -> Self {
        Osal {
            tasks,
            events: EventTable::new(),
            clock,
            domain,
            state: CsCell::new(OsalState::new()),
            initialized: AtomicBool::new(false),
            active: AtomicU8::new(TASK_NO_TASK),
        }
    }

    /// Initialize the context and run every task's init hook
    ///
    /// # Returns
    /// * `Ok(())` - Initialization successful
    /// * `Err(OsalError::AlreadyInitialized)` - Called twice
    /// * `Err(OsalError::InvalidTask)` - Task table larger than `CFG_TASKS_MAX`
    pub fn init_system(&self) -> OsResult<()> {
        if self.is_initialized() {
            return Err(OsalError::AlreadyInitialized);
        }

        if self.tasks.len() > CFG_TASKS_MAX || self.tasks.len() > PROXY_ID_FLAG as usize {
            crate::error!("{} tasks exceed the table", self.tasks.len());
            return Err(OsalError::InvalidTask);
        }

        let now = self.clock.ticks();
        critical_section(|cs| self.state.get(cs).reset(now));
        self.events.reset();
        self.active.store(TASK_NO_TASK, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);

        for (idx, task) in self.tasks.iter().enumerate() {
            if let Some(init) = task.init {
                crate::debug!("init task {}", idx);
                self.enter_task(idx as TaskId);
                init(self, idx as TaskId);
                self.leave_task();
            }
        }

        crate::info!("osal up, {} tasks", self.tasks.len());
        Ok(())
    }

    /// Check if `init_system` has run
    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Number of registered tasks
    #[inline(always)]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Name of a registered task
    pub fn task_name(&self, task_id: TaskId) -> Option<&'static str> {
        self.tasks.get(task_id as usize).map(|t| t.name)
    }

    /// Task whose handler or init hook is running, `TASK_NO_TASK` otherwise
    #[inline(always)]
    pub fn self_id(&self) -> TaskId {
        self.active.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub(crate) fn enter_task(&self, task_id: TaskId) {
        self.active.store(task_id, Ordering::Release);
    }

    #[inline(always)]
    pub(crate) fn leave_task(&self) {
        self.active.store(TASK_NO_TASK, Ordering::Release);
    }

    /// Number of task IDs with an event slot
    #[inline(always)]
    pub(crate) fn task_limit(&self) -> usize {
        self.tasks.len().min(CFG_TASKS_MAX)
    }

    #[inline(always)]
    pub(crate) fn check_task(&self, task_id: TaskId) -> OsResult<()> {
        if (task_id as usize) < self.task_limit() {
            Ok(())
        } else {
            Err(OsalError::InvalidTask)
        }
    }

    /// Set events on a task
    ///
    /// Callable from ISR and task context. With a bridge, a set from outside
    /// any task also wakes the scheduler.
    ///
    /// # Returns
    /// * `Ok(())` - Events set
    /// * `Err(OsalError::InvalidTask)` - No such task
    pub fn set_event(&self, task_id: TaskId, events: EventMask) -> OsResult<()> {
        self.check_task(task_id)?;
        self.events.set(task_id, events);

        if let Some(bridge) = self.domain.bridge() {
            if is_isr_context() || self.self_id() == TASK_NO_TASK {
                bridge.signal();
            }
        }
        Ok(())
    }

    /// Clear events on a task
    pub fn clear_event(&self, task_id: TaskId, events: EventMask) -> OsResult<()> {
        self.check_task(task_id)?;
        self.events.clear(task_id, events);
        Ok(())
    }

    /// Events currently pending for a task, 0 for unknown IDs
    pub fn pending_events(&self, task_id: TaskId) -> EventMask {
        if self.check_task(task_id).is_ok() {
            self.events.pending(task_id)
        } else {
            0
        }
    }
}
