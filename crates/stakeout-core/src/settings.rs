//! # Breakpoint and Watchpoint Settings
//!
//! The declared, client-facing shape of a breakpoint or watchpoint: what
//! the user asked for, before it is reconciled against per-process
//! installations. Settings are plain data; all behavior lives on the
//! [`crate::breakpoint::Breakpoint`] and [`crate::watchpoint::Watchpoint`]
//! aggregates.

use std::fmt;

use crate::arch::WatchAccess;
use crate::error::{Result, StakeoutError};
use crate::types::{Address, AddressRange, BreakpointId, ProcessKoid, ThreadKoid};

/// Kind of breakpoint or watchpoint declared by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakpointType
{
    /// Software breakpoint implemented via trap instructions. Managed by a
    /// different subsystem; carried here so exception routing can tell the
    /// kinds apart.
    Software,
    /// Hardware execution breakpoint configured via CPU debug registers.
    Hardware,
    /// Watchpoint triggering on read or write access.
    ReadWrite,
    /// Watchpoint triggering on write access only.
    Write,
}

impl BreakpointType
{
    /// Whether this kind is backed by a hardware watch slot.
    #[must_use]
    pub fn is_watchpoint(self) -> bool
    {
        matches!(self, BreakpointType::ReadWrite | BreakpointType::Write)
    }

    /// The hardware access type for a watchpoint kind.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: the kind is not a watchpoint kind
    pub fn watch_access(self) -> Result<WatchAccess>
    {
        match self {
            BreakpointType::Write => Ok(WatchAccess::Write),
            BreakpointType::ReadWrite => Ok(WatchAccess::ReadWrite),
            kind => Err(StakeoutError::InvalidArgument(format!(
                "{kind} is not a watchpoint kind"
            ))),
        }
    }
}

impl fmt::Display for BreakpointType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            BreakpointType::Software => write!(f, "software"),
            BreakpointType::Hardware => write!(f, "hardware"),
            BreakpointType::ReadWrite => write!(f, "read-write"),
            BreakpointType::Write => write!(f, "write"),
        }
    }
}

/// One declared breakpoint location.
///
/// `thread` of `None` means every thread of the process, present and
/// future; an explicit koid pins the installation to that thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BreakpointLocation
{
    /// Process to install in.
    pub process: ProcessKoid,
    /// Specific thread, or `None` for all threads of the process.
    pub thread: Option<ThreadKoid>,
    /// Address to break at.
    pub address: Address,
}

/// One declared watchpoint location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchpointLocation
{
    /// Process to install in.
    pub process: ProcessKoid,
    /// Specific thread, or `None` for all threads of the process.
    pub thread: Option<ThreadKoid>,
    /// Range to watch.
    pub range: AddressRange,
}

/// Client-declared breakpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSettings
{
    /// Client-assigned id.
    pub id: BreakpointId,
    /// Kind of breakpoint.
    pub kind: BreakpointType,
    /// Human-readable name for logs and the front-end.
    pub name: String,
    /// Remove after the first hit.
    pub one_shot: bool,
    /// Declared locations, possibly spanning several processes.
    pub locations: Vec<BreakpointLocation>,
}

impl BreakpointSettings
{
    /// Empty settings for a freshly created breakpoint.
    #[must_use]
    pub fn empty(id: BreakpointId, kind: BreakpointType) -> Self
    {
        BreakpointSettings {
            id,
            kind,
            name: String::new(),
            one_shot: false,
            locations: Vec::new(),
        }
    }
}

/// Client-declared watchpoint settings.
///
/// Identical shape to [`BreakpointSettings`] with ranges instead of
/// addresses; `kind` must be one of the watchpoint kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointSettings
{
    /// Client-assigned id (shared id space with breakpoints).
    pub id: BreakpointId,
    /// Kind of watchpoint (`ReadWrite` or `Write`).
    pub kind: BreakpointType,
    /// Human-readable name for logs and the front-end.
    pub name: String,
    /// Remove after the first hit.
    pub one_shot: bool,
    /// Declared locations, possibly spanning several processes.
    pub locations: Vec<WatchpointLocation>,
}

impl WatchpointSettings
{
    /// Empty settings for a freshly created watchpoint.
    #[must_use]
    pub fn empty(id: BreakpointId, kind: BreakpointType) -> Self
    {
        WatchpointSettings {
            id,
            kind,
            name: String::new(),
            one_shot: false,
            locations: Vec::new(),
        }
    }
}
