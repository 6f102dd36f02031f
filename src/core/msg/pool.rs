//! Message buffer pool
//!
//! Fixed arena of message slots. Each slot carries the OSAL message header
//! (`next`, `len`, `dest_id`) in front of its payload, so a [`MsgPtr`] is all
//! a caller needs to hand a buffer from one task to another.

use crate::config::{CFG_MSG_PAYLOAD_MAX, CFG_MSG_POOL_SIZE};
use crate::error::{OsResult, OsalError};
use crate::types::id::TASK_NO_TASK;
use crate::types::{MsgLen, TaskId};

/// Handle to an allocated message
///
/// Behaves like the raw buffer pointer of the C API: copying it does not copy
/// the message, and ownership moves by convention (queue, then receiving task,
/// then `msg_deallocate`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgPtr(u16);

impl MsgPtr {
    /// Slot index inside the pool
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Header prefixed to every message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MsgHdr {
    /// Next message in whichever queue this one sits in
    pub(crate) next: Option<MsgPtr>,
    /// Payload length in bytes
    pub(crate) len: MsgLen,
    /// Destination task, or `TASK_NO_TASK` while unqueued
    pub(crate) dest_id: TaskId,
}

impl MsgHdr {
    const FRESH: MsgHdr = MsgHdr { next: None, len: 0, dest_id: TASK_NO_TASK };

    /// Not linked into any queue
    #[inline(always)]
    pub(crate) fn is_unqueued(&self) -> bool {
        self.next.is_none() && self.dest_id == TASK_NO_TASK
    }
}

#[derive(Clone, Copy)]
struct MsgSlot {
    hdr: MsgHdr,
    in_use: bool,
    data: [u8; CFG_MSG_PAYLOAD_MAX],
}

impl MsgSlot {
    const EMPTY: MsgSlot = MsgSlot {
        hdr: MsgHdr::FRESH,
        in_use: false,
        data: [0; CFG_MSG_PAYLOAD_MAX],
    };
}

/// Arena of message buffers
pub struct MsgPool {
    slots: [MsgSlot; CFG_MSG_POOL_SIZE],
    used: usize,
    /// Slot to start the next free-slot search from
    hint: usize,
}

impl MsgPool {
    pub const fn new() -> Self {
        MsgPool {
            slots: [MsgSlot::EMPTY; CFG_MSG_POOL_SIZE],
            used: 0,
            hint: 0,
        }
    }

    pub fn reset(&mut self) {
        self.slots = [MsgSlot::EMPTY; CFG_MSG_POOL_SIZE];
        self.used = 0;
        self.hint = 0;
    }

    /// Allocate a zeroed message of `len` bytes
    pub fn allocate(&mut self, len: usize) -> Option<MsgPtr> {
        if len > CFG_MSG_PAYLOAD_MAX || self.used == CFG_MSG_POOL_SIZE {
            return None;
        }

        let idx = (0..CFG_MSG_POOL_SIZE)
            .map(|off| (self.hint + off) % CFG_MSG_POOL_SIZE)
            .find(|&i| !self.slots[i].in_use)?;

        let slot = &mut self.slots[idx];
        slot.in_use = true;
        slot.hdr = MsgHdr { len: len as MsgLen, ..MsgHdr::FRESH };
        slot.data[..len].fill(0);

        self.used += 1;
        self.hint = (idx + 1) % CFG_MSG_POOL_SIZE;
        Some(MsgPtr(idx as u16))
    }

    /// Return a message to the pool
    pub fn deallocate(&mut self, msg: MsgPtr) -> OsResult<()> {
        let hdr = self.hdr(msg).ok_or(OsalError::InvalidMsgPointer)?;
        if hdr.dest_id != TASK_NO_TASK {
            return Err(OsalError::MsgBufferNotAvail);
        }

        self.slots[msg.index()] = MsgSlot::EMPTY;
        self.used -= 1;
        Ok(())
    }

    /// Whether `msg` names a live allocation
    #[inline]
    pub fn is_live(&self, msg: MsgPtr) -> bool {
        self.slots.get(msg.index()).is_some_and(|s| s.in_use)
    }

    #[inline]
    pub(crate) fn hdr(&self, msg: MsgPtr) -> Option<&MsgHdr> {
        self.slots
            .get(msg.index())
            .filter(|s| s.in_use)
            .map(|s| &s.hdr)
    }

    #[inline]
    pub(crate) fn hdr_mut(&mut self, msg: MsgPtr) -> Option<&mut MsgHdr> {
        self.slots
            .get_mut(msg.index())
            .filter(|s| s.in_use)
            .map(|s| &mut s.hdr)
    }

    /// Payload of a live message
    pub fn data(&self, msg: MsgPtr) -> Option<&[u8]> {
        let slot = self.slots.get(msg.index()).filter(|s| s.in_use)?;
        Some(&slot.data[..slot.hdr.len as usize])
    }

    /// Mutable payload of a live message
    pub fn data_mut(&mut self, msg: MsgPtr) -> Option<&mut [u8]> {
        let slot = self.slots.get_mut(msg.index()).filter(|s| s.in_use)?;
        Some(&mut slot.data[..slot.hdr.len as usize])
    }

    /// Event code of a message (first payload byte), 0 for empty payloads
    #[inline]
    pub(crate) fn event(&self, msg: MsgPtr) -> u8 {
        self.data(msg).and_then(|d| d.first().copied()).unwrap_or(0)
    }

    /// Number of free slots
    #[inline]
    pub fn available(&self) -> usize {
        CFG_MSG_POOL_SIZE - self.used
    }
}

impl Default for MsgPool {
    fn default() -> Self {
        Self::new()
    }
}
