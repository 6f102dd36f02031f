//! Host environment interfaces
//!
//! The scheduler needs a tick source and one of two wake-up strategies:
//! - standalone: nothing to wait on, an idle hook runs when no task is ready
//! - bridged: a cross-domain transport that also owns the blocking wait
//!
//! The strategy is picked once, when the [`Osal`](crate::Osal) context is
//! built, through [`Domain`].

use crate::error::BridgeError;
use crate::types::{EntityId, Millis};

/// Free-running hardware or kernel tick counter
pub trait Clock: Sync {
    /// Current tick count; allowed to wrap
    fn ticks(&self) -> u32;

    /// Duration of one tick in microseconds
    fn tick_period_us(&self) -> u32;
}

/// Low-power hook called when no task has pending events
pub trait IdleHook: Sync {
    fn idle(&self);
}

/// Idle hook that returns immediately, so the run loop busy-polls
#[derive(Debug, Default, Clone, Copy)]
pub struct BusyPoll;

impl IdleHook for BusyPoll {
    #[inline]
    fn idle(&self) {}
}

/// Payload rewrite requested by the sender of a cross-domain message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MsgFormat {
    /// Deliver as is
    #[default]
    Keep,
    /// Replace payload byte 0 with the sender's proxy task ID
    FirstByteTaskId,
    /// Replace payload byte 2 with the sender's proxy task ID
    ThirdByteTaskId,
}

impl MsgFormat {
    /// Payload offset holding the sender ID, if any
    #[inline]
    pub const fn sender_offset(self) -> Option<usize> {
        match self {
            MsgFormat::Keep => None,
            MsgFormat::FirstByteTaskId => Some(0),
            MsgFormat::ThirdByteTaskId => Some(2),
        }
    }
}

/// Metadata of a message fetched from the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inbound {
    /// Foreign sender
    pub src: EntityId,
    /// Local dispatch entity the message is addressed to
    pub dst: EntityId,
    pub format: MsgFormat,
    /// Number of payload bytes written into the fetch buffer
    pub len: usize,
}

/// Cross-domain transport and wait primitive
///
/// Implemented by the host environment (an RTOS thread, an IPC mailbox,
/// a test double). The OSAL never looks inside the transport's wire format.
pub trait Bridge: Sync {
    /// Non-blocking fetch of the next inbound message into `buf`
    fn fetch(&self, buf: &mut [u8]) -> Option<Inbound>;

    /// Hand a payload to the foreign entity `dst` on behalf of `src`
    fn send(&self, src: EntityId, dst: EntityId, format: MsgFormat, payload: &[u8]) -> Result<(), BridgeError>;

    /// (Re)arm the single one-shot alarm that wakes [`Bridge::wait`]
    fn set_alarm(&self, ms: Millis);

    /// Block until the alarm fires or [`Bridge::signal`] is called
    fn wait(&self);

    /// Wake a pending or the next [`Bridge::wait`]
    fn signal(&self);
}

/// How the scheduler waits for work
#[derive(Clone, Copy)]
pub enum Domain<'a> {
    /// Bare-metal cooperative loop
    Standalone(&'a dyn IdleHook),
    /// Layered on a foreign kernel through a bridge
    Bridged(&'a dyn Bridge),
}

impl<'a> Domain<'a> {
    #[inline]
    pub fn bridge(&self) -> Option<&'a dyn Bridge> {
        match *self {
            Domain::Bridged(b) => Some(b),
            Domain::Standalone(_) => None,
        }
    }
}
