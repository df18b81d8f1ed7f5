//! # Error Types
//!
//! General error handling for the breakpoint/watchpoint resource manager.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::{Address, AddressRange, ThreadKoid};

/// Main error type for resource-manager operations
///
/// ## Error Categories
///
/// 1. **Resource errors**: ResourceExhausted (all debug-register slots full)
/// 2. **Lookup errors**: BreakpointNotInstalled, WatchpointNotInstalled
/// 3. **Encoding errors**: UnrepresentableRange, AlreadyBound
/// 4. **Collaborator errors**: SuspendFailed, ReadRegistersFailed,
///    WriteRegistersFailed, ThreadGone
/// 5. **Catch-all**: InvalidArgument, Internal
///
/// Codec-level operations return these without mutating the register
/// snapshot. Aggregate-level passes treat the collaborator variants as
/// per-thread, non-fatal conditions.
#[derive(Error, Debug)]
pub enum StakeoutError
{
    /// All usable debug-register slots on the target thread are enabled
    ///
    /// Recoverable: retry after another installation is removed.
    /// - x86-64: maximum 4 slots (DR0-DR3), shared between execution
    ///   breakpoints and watchpoints
    /// - ARM64: up to 16 breakpoint and 16 watchpoint slots, the usable
    ///   count comes from the hardware descriptor at attach time
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Remove requested for an address no enabled slot currently holds
    #[error("No hardware breakpoint installed at {0}")]
    BreakpointNotInstalled(Address),

    /// Remove requested for a range no enabled slot currently covers
    #[error("No watchpoint installed over {0}")]
    WatchpointNotInstalled(AddressRange),

    /// Install request exactly duplicates a live watch slot
    ///
    /// The duplicate is rejected rather than silently merged; the existing
    /// installation is untouched.
    #[error("A watchpoint is already installed over {0}")]
    AlreadyBound(AddressRange),

    /// The requested watch range cannot be expressed by the hardware
    ///
    /// Surfaced to the end user as "cannot set a watchpoint here". Watch
    /// windows are 1, 2, 4, or 8 bytes with a size-aligned base; a request
    /// that no such window covers has no encoding.
    #[error("Range {0} is not representable by hardware watchpoints")]
    UnrepresentableRange(AddressRange),

    /// Malformed request (wrong watch type, architecture mismatch, etc.)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failed to suspend the target thread before rewriting its registers
    #[error("Failed to suspend thread: {0}")]
    SuspendFailed(String),

    /// Failed to read the debug-register state of the target thread
    #[error("Failed to read debug registers: {0}")]
    ReadRegistersFailed(String),

    /// Failed to write the debug-register state back to the target thread
    #[error("Failed to write debug registers: {0}")]
    WriteRegistersFailed(String),

    /// The target thread exited between enumeration and suspension
    ///
    /// Expected during teardown races; aggregate passes treat the thread as
    /// already gone rather than failing the pass.
    #[error("Thread {0} is gone")]
    ThreadGone(ThreadKoid),

    /// Unexpected collaborator failure that fits no other category
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StakeoutError
{
    /// Whether this error reports a per-thread collaborator failure.
    ///
    /// Aggregate update passes log these and continue with the remaining
    /// threads instead of aborting.
    #[must_use]
    pub fn is_thread_failure(&self) -> bool
    {
        matches!(
            self,
            StakeoutError::SuspendFailed(_)
                | StakeoutError::ReadRegistersFailed(_)
                | StakeoutError::WriteRegistersFailed(_)
                | StakeoutError::ThreadGone(_)
        )
    }
}

/// Convenience type alias for `Result<T, StakeoutError>`
pub type Result<T> = std::result::Result<T, StakeoutError>;
