//! Critical section protected cell
//!
//! Holds the mutable half of an [`Osal`](crate::Osal) context: message pool,
//! queue head, timer list, proxy table and time base.

use core::cell::UnsafeCell;
use crate::critical::CriticalSection;

/// A cell that can only be accessed within a critical section.
///
/// Callers must not call `get` again while a reference from a previous `get`
/// is still alive; OSAL operations take the cell once per critical section.
pub struct CsCell<T>(UnsafeCell<T>);

// SAFETY: single-core target, access is serialised by interrupt masking.
unsafe impl<T: Send> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    /// Create a new CsCell
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Get a mutable reference to the inner value
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub fn get<'cs>(&'cs self, _cs: &'cs CriticalSection) -> &'cs mut T {
        unsafe { &mut *self.0.get() }
    }
}
