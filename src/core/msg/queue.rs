//! Message queue - singly linked list of messages threaded through the pool
//!
//! Messages are appended at the tail for FIFO delivery and unlinked from
//! anywhere in the list. The links live in the message headers, so a queue
//! is only a head/tail pair and every operation needs the owning pool.

use super::pool::{MsgPool, MsgPtr};
use crate::types::id::TASK_NO_TASK;
use crate::types::TaskId;

/// Queue of messages
///
/// The OSAL keeps one global queue inside each context; callers may keep
/// their own for deferred processing.
#[derive(Debug, Default)]
pub struct MsgQueue {
    head: Option<MsgPtr>,
    tail: Option<MsgPtr>,
}

impl MsgQueue {
    /// Create a new empty queue
    pub const fn new() -> Self {
        MsgQueue { head: None, tail: None }
    }

    /// Get head of queue
    #[inline]
    pub fn head(&self) -> Option<MsgPtr> {
        self.head
    }

    /// Check if queue is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append `msg` at the tail and tag it with `dest`
    ///
    /// Caller must ensure `msg` is live and not linked into any queue.
    pub(crate) fn insert_tail(&mut self, pool: &mut MsgPool, msg: MsgPtr, dest: TaskId) {
        if let Some(hdr) = pool.hdr_mut(msg) {
            hdr.next = None;
            hdr.dest_id = dest;
        }

        match self.tail {
            Some(tail) => {
                if let Some(tail_hdr) = pool.hdr_mut(tail) {
                    tail_hdr.next = Some(msg);
                }
            }
            None => {
                // Queue is empty - this becomes head
                self.head = Some(msg);
            }
        }

        self.tail = Some(msg);
    }

    /// Insert `msg` at the head and tag it with `dest`
    ///
    /// Caller must ensure `msg` is live and not linked into any queue.
    pub(crate) fn insert_head(&mut self, pool: &mut MsgPool, msg: MsgPtr, dest: TaskId) {
        if let Some(hdr) = pool.hdr_mut(msg) {
            hdr.next = self.head;
            hdr.dest_id = dest;
        }

        if self.head.is_none() {
            self.tail = Some(msg);
        }

        self.head = Some(msg);
    }

    /// Unlink `msg`, whose predecessor is `prev` (`None` for the head)
    ///
    /// The message leaves in the unqueued state (`next` cleared,
    /// destination reset to `TASK_NO_TASK`).
    pub(crate) fn extract(&mut self, pool: &mut MsgPool, msg: MsgPtr, prev: Option<MsgPtr>) {
        let next = pool.hdr(msg).and_then(|h| h.next);

        match prev {
            Some(p) => {
                if let Some(prev_hdr) = pool.hdr_mut(p) {
                    prev_hdr.next = next;
                }
            }
            None => {
                // This was the head
                self.head = next;
            }
        }

        if self.tail == Some(msg) {
            self.tail = prev;
        }

        if let Some(hdr) = pool.hdr_mut(msg) {
            hdr.next = None;
            hdr.dest_id = TASK_NO_TASK;
        }
    }

    /// Unlink and return the head
    pub(crate) fn remove_head(&mut self, pool: &mut MsgPool) -> Option<MsgPtr> {
        let head = self.head?;
        self.extract(pool, head, None);
        Some(head)
    }

    /// Walk the queue from head to tail
    pub fn iter<'p>(&self, pool: &'p MsgPool) -> Iter<'p> {
        Iter { pool, cur: self.head }
    }

    /// First message tagged with `dest`, with its predecessor
    pub(crate) fn find_for(&self, pool: &MsgPool, dest: TaskId) -> Option<(Option<MsgPtr>, MsgPtr)> {
        let mut prev = None;
        for msg in self.iter(pool) {
            if pool.hdr(msg).is_some_and(|h| h.dest_id == dest) {
                return Some((prev, msg));
            }
            prev = Some(msg);
        }
        None
    }

    /// Predecessor of `msg`, or `None` when `msg` is the head or absent
    pub(crate) fn prev_of(&self, pool: &MsgPool, msg: MsgPtr) -> Option<MsgPtr> {
        let mut prev = None;
        for m in self.iter(pool) {
            if m == msg {
                return prev;
            }
            prev = Some(m);
        }
        None
    }

    /// Number of queued messages
    pub fn len(&self, pool: &MsgPool) -> usize {
        self.iter(pool).count()
    }
}

/// Iterator over a [`MsgQueue`]
pub struct Iter<'p> {
    pool: &'p MsgPool,
    cur: Option<MsgPtr>,
}

impl Iterator for Iter<'_> {
    type Item = MsgPtr;

    fn next(&mut self) -> Option<MsgPtr> {
        let cur = self.cur?;
        self.cur = self.pool.hdr(cur).and_then(|h| h.next);
        Some(cur)
    }
}
