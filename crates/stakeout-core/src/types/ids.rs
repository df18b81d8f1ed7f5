//! Kernel-object and client-assigned identifier types.

use std::fmt;

/// Kernel object identifier of a process
///
/// ## Why wrap it in a struct?
///
/// Using a newtype pattern instead of a raw `u64` provides:
/// - **Type safety**: a process koid cannot be passed where a thread koid is
///   expected
/// - **Self-documenting code**: makes it clear what the value represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessKoid(pub u64);

impl ProcessKoid
{
    /// Get the raw `u64` representation of the process koid.
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.0
    }
}

impl From<u64> for ProcessKoid
{
    fn from(koid: u64) -> Self
    {
        ProcessKoid(koid)
    }
}

impl fmt::Display for ProcessKoid
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "process-{}", self.0)
    }
}

/// Kernel object identifier of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadKoid(pub u64);

impl ThreadKoid
{
    /// Get the raw `u64` representation of the thread koid.
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.0
    }
}

impl From<u64> for ThreadKoid
{
    fn from(koid: u64) -> Self
    {
        ThreadKoid(koid)
    }
}

impl fmt::Display for ThreadKoid
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "thread-{}", self.0)
    }
}

/// Client-assigned identifier for a breakpoint or watchpoint
///
/// The debugger front-end owns this id space; the agent never allocates ids
/// itself. Breakpoints and watchpoints share the space, so a single id names
/// at most one aggregate of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BreakpointId(u32);

impl BreakpointId
{
    /// Create a new identifier from a raw value.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self
    {
        Self(value)
    }

    /// Get the raw numeric representation (useful for logging / errors).
    #[must_use]
    pub const fn raw(self) -> u32
    {
        self.0
    }
}

impl fmt::Display for BreakpointId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "bp-{}", self.0)
    }
}
