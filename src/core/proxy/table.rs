//! Proxy and dispatch tables
//!
//! Two mappings live here:
//! - local task -> foreign dispatch entity, filled by enrollment at startup
//! - foreign sender -> proxy task ID, filled lazily as messages arrive
//!
//! Proxy task ID `i | PROXY_ID_FLAG` stands for the entity stored in slot `i`.
//! Running out of slots means entities leak across the boundary, so it is
//! fatal rather than an error.

use crate::config::{CFG_PROXY_MAX, CFG_TASKS_MAX};
use crate::types::id::{PROXY_ID_FLAG, TASK_NO_TASK};
use crate::types::{EntityId, TaskId};

/// How a local task is known to the foreign domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrollment {
    None,
    /// Sends and receives under this entity
    Dispatch(EntityId),
    /// Only sends under this entity; never a delivery target
    SenderOnly(EntityId),
}

impl Enrollment {
    #[inline]
    fn entity(self) -> Option<EntityId> {
        match self {
            Enrollment::None => None,
            Enrollment::Dispatch(e) | Enrollment::SenderOnly(e) => Some(e),
        }
    }
}

pub struct ProxyTable {
    aliens: [Option<EntityId>; CFG_PROXY_MAX],
    enrolled: [Enrollment; CFG_TASKS_MAX],
    notask: Option<EntityId>,
}

impl ProxyTable {
    pub const fn new() -> Self {
        ProxyTable {
            aliens: [None; CFG_PROXY_MAX],
            enrolled: [Enrollment::None; CFG_TASKS_MAX],
            notask: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Proxy task ID for a foreign sender, allocating a slot on first use
    ///
    /// # Panics
    /// When every slot is taken by another entity.
    pub fn alien_to_proxy(&mut self, alien: EntityId) -> TaskId {
        if let Some(slot) = self.aliens.iter().position(|&a| a == Some(alien)) {
            return slot as TaskId | PROXY_ID_FLAG;
        }

        match self.aliens.iter().position(Option::is_none) {
            Some(slot) => {
                self.aliens[slot] = Some(alien);
                crate::debug!("proxy {} -> entity {}", slot as u8 | PROXY_ID_FLAG, alien);
                slot as TaskId | PROXY_ID_FLAG
            }
            None => crate::fatal!("proxy table full, entity {}", alien),
        }
    }

    /// Foreign entity behind a proxy task ID
    ///
    /// # Panics
    /// When `proxy` lacks the tag bit or names an unmapped slot.
    pub fn proxy_to_alien(&self, proxy: TaskId) -> EntityId {
        if proxy & PROXY_ID_FLAG == 0 {
            crate::fatal!("task {} is not a proxy", proxy);
        }

        let slot = (proxy & !PROXY_ID_FLAG) as usize;
        match self.aliens.get(slot).copied().flatten() {
            Some(alien) => alien,
            None => crate::fatal!("proxy {} is unmapped", proxy),
        }
    }

    /// Record a task that both sends and receives across the boundary
    pub fn enroll_dispatch(&mut self, task_id: TaskId, entity: EntityId) {
        self.enrolled[task_id as usize] = Enrollment::Dispatch(entity);
    }

    /// Record a task that only sends across the boundary
    pub fn enroll_sender(&mut self, task_id: TaskId, entity: EntityId) {
        self.enrolled[task_id as usize] = Enrollment::SenderOnly(entity);
    }

    /// Identity used for sends made outside any task
    pub fn enroll_notask(&mut self, entity: EntityId) {
        self.notask = Some(entity);
    }

    /// Local task receiving for `entity`
    pub fn dispatch_to_task(&self, entity: EntityId) -> Option<TaskId> {
        self.enrolled
            .iter()
            .position(|&e| e == Enrollment::Dispatch(entity))
            .map(|i| i as TaskId)
    }

    /// Entity a send from `task_id` goes out under
    pub fn sender_of(&self, task_id: TaskId) -> Option<EntityId> {
        if task_id == TASK_NO_TASK {
            return self.notask;
        }
        self.enrolled.get(task_id as usize).and_then(|e| e.entity())
    }

    pub fn enrollment(&self, task_id: TaskId) -> Enrollment {
        self.enrolled.get(task_id as usize).copied().unwrap_or(Enrollment::None)
    }
}

impl Default for ProxyTable {
    fn default() -> Self {
        Self::new()
    }
}
