//! # stakeout-core
//!
//! Hardware breakpoint/watchpoint resource management for the Stakeout
//! debugger agent.
//!
//! This crate owns the scarce per-thread CPU debug registers: it allocates,
//! encodes, and tracks the slots, and reconciles them against the
//! higher-level model of user-declared breakpoints and watchpoints that may
//! span many processes and threads simultaneously.
//!
//! ## Layers
//!
//! - [`arch`]: pure per-architecture register codecs (x86-64 DR0-DR7,
//!   ARM64 DBGB*/DBGW* with byte-address-select masks)
//! - [`allocator`]: the slot allocation policy, parameterized by the live
//!   hardware descriptor at attach time
//! - [`process_breakpoint`] / [`process_watchpoint`]: per-(process, address)
//!   and per-(process, range) installed state, driving per-thread
//!   install/uninstall through the [`handles`] collaborator traits
//! - [`breakpoint`] / [`watchpoint`]: the user-facing aggregates,
//!   reconciling declared settings through a registry delegate
//!
//! ## Concurrency
//!
//! A single-threaded event loop dispatches one exception or settings change
//! at a time, so nothing here locks. The only true hazard is the target
//! thread itself, which is suspended for the duration of each
//! read-modify-write of its register file; a thread exiting mid-operation
//! is an expected, non-fatal outcome.

pub mod allocator;
pub mod arch;
pub mod breakpoint;
pub mod error;
pub mod handles;
pub mod process_breakpoint;
pub mod process_watchpoint;
pub mod settings;
pub mod types;
pub mod watchpoint;

pub use allocator::HardwareSlotAllocator;
pub use arch::{Architecture, DebugRegisters, WatchAccess, WatchpointInstallation};
pub use breakpoint::{does_exception_apply, Breakpoint, BreakpointDelegate, BreakpointStats, HitOutcome};
// Re-export commonly used types
pub use error::{Result, StakeoutError};
pub use process_breakpoint::ProcessBreakpoint;
pub use process_watchpoint::ProcessWatchpoint;
pub use settings::{BreakpointLocation, BreakpointSettings, BreakpointType, WatchpointLocation, WatchpointSettings};
pub use types::{Address, AddressRange, BreakpointId, ProcessKoid, ThreadKoid};
pub use watchpoint::{Watchpoint, WatchpointDelegate};
