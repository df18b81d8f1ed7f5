//! # Architecture-Specific Register Codecs
//!
//! Pure functions that read and mutate in-memory snapshots of a thread's
//! debug-register state. No I/O, no thread ownership: a snapshot comes in
//! through [`crate::handles::ThreadHandle::read_debug_registers`], gets
//! mutated here, and is written back by the caller.
//!
//! ## Supported Architectures
//!
//! - **x86-64**: DR0-DR7 (`x64` module). Four physical slots shared between
//!   execution breakpoints and watchpoints.
//! - **ARM64**: DBGBCR/DBGBVR and DBGWCR/DBGWVR (`arm64` module). Separate
//!   breakpoint and watchpoint register files of up to 16 slots each; the
//!   usable count is a runtime parameter read from the hardware descriptor.
//!
//! ## Failure Semantics
//!
//! Every operation in these modules is total over its inputs and never
//! partially mutates the snapshot on failure.

pub mod arm64;
pub mod x64;

use std::fmt;

use crate::types::AddressRange;

pub use arm64::Arm64DebugRegs;
pub use x64::X64DebugRegs;

/// CPU architecture of an attached process.
///
/// Selected once at attach time; all codec dispatch flows through it rather
/// than through compile-time configuration, so a single agent binary can
/// drive targets of either architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// x86-64 (DR0-DR7 debug registers).
    X64,
    /// ARM64 / AArch64 (DBGB*/DBGW* debug registers).
    Arm64,
}

impl Architecture
{
    /// Architectural maximum number of hardware breakpoint slots.
    #[must_use]
    pub const fn max_hw_breakpoints(self) -> usize
    {
        match self {
            Architecture::X64 => x64::MAX_HW_SLOTS,
            Architecture::Arm64 => arm64::MAX_HW_BREAKPOINTS,
        }
    }

    /// Architectural maximum number of watchpoint slots.
    #[must_use]
    pub const fn max_watchpoints(self) -> usize
    {
        match self {
            Architecture::X64 => x64::MAX_HW_SLOTS,
            Architecture::Arm64 => arm64::MAX_WATCHPOINTS,
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::X64 => write!(f, "x64"),
            Architecture::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Access type that triggers a watchpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchAccess
{
    /// Trigger on write access to the watched bytes.
    Write,
    /// Trigger on read or write access to the watched bytes.
    ReadWrite,
}

/// Outcome of a successful watchpoint installation.
///
/// The installed range is the hardware-aligned window the slot actually
/// covers, which may be a superset of the range the caller asked for. Callers
/// must hold on to it: removal is matched against the installed range, not
/// the original request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchpointInstallation
{
    /// Index of the slot the watchpoint landed in.
    pub slot: usize,
    /// The hardware-aligned range the slot covers.
    pub range: AddressRange,
}

/// A thread's debug-register state, tagged by architecture.
///
/// Owned per-thread by the thread's handle; created and destroyed with the
/// thread's lifetime; mutated only through the codec functions (via
/// [`crate::allocator::HardwareSlotAllocator`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugRegisters
{
    /// x86-64 snapshot.
    X64(X64DebugRegs),
    /// ARM64 snapshot.
    Arm64(Arm64DebugRegs),
}

impl DebugRegisters
{
    /// Architecture this snapshot belongs to.
    #[must_use]
    pub fn architecture(&self) -> Architecture
    {
        match self {
            DebugRegisters::X64(_) => Architecture::X64,
            DebugRegisters::Arm64(_) => Architecture::Arm64,
        }
    }

    /// Fresh all-zero snapshot for `arch`.
    #[must_use]
    pub fn empty(arch: Architecture) -> Self
    {
        match arch {
            Architecture::X64 => DebugRegisters::X64(X64DebugRegs::default()),
            Architecture::Arm64 => DebugRegisters::Arm64(Arm64DebugRegs::default()),
        }
    }
}
