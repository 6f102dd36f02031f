//! Error types for the OSAL
//!
//! Status values keep the numeric codes of the OSAL C API so they can be
//! passed across the bridge unchanged. Allocation failures are not errors
//! here: allocators return `None`.

/// OSAL status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsalError {
    /// No error
    Success = 0x00,
    /// Generic failure (cross-domain send rejected)
    Failure = 0x01,
    /// Invalid parameter
    InvalidParameter = 0x02,
    /// Task ID out of the configured range
    InvalidTask = 0x03,
    /// Message still queued and cannot be freed
    MsgBufferNotAvail = 0x04,
    /// Message handle does not name a fresh, live message
    InvalidMsgPointer = 0x05,
    /// No armed timer for this (task, event) pair
    InvalidEventId = 0x06,
    /// Timer pool exhausted
    NoTimerAvail = 0x08,
    /// Context used before `init_system`
    NotInitialized = 0x20,
    /// `init_system` called twice
    AlreadyInitialized = 0x21,
}

/// Result type alias for OSAL operations
pub type OsResult<T> = Result<T, OsalError>;

impl OsalError {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == OsalError::Success
    }

    #[inline]
    pub fn is_err(self) -> bool {
        self != OsalError::Success
    }

    /// Raw OSAL status byte
    #[inline]
    pub fn status(self) -> u8 {
        self as u8
    }

    /// Collapse an [`OsResult`] into its status byte
    pub fn from_result<T>(res: OsResult<T>) -> u8 {
        match res {
            Ok(_) => OsalError::Success.status(),
            Err(e) => e.status(),
        }
    }
}

impl From<OsalError> for u8 {
    fn from(err: OsalError) -> u8 {
        err.status()
    }
}

/// Errors reported by a cross-domain transport
///
/// Values follow the ICall errno convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i8)]
pub enum BridgeError {
    InvalidService = -1,
    InvalidParameter = -3,
    NoResource = -4,
    UnknownThread = -5,
    CorruptMsg = -6,
    Overflow = -7,
}
