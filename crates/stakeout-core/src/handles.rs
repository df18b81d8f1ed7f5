//! # Collaborator Interfaces
//!
//! Traits implemented by the surrounding process/thread management
//! subsystem. The resource manager drives per-thread register rewrites
//! through these seams and never touches kernel handles itself, which is
//! also what makes every aggregate in this crate testable against plain
//! in-memory mocks.
//!
//! ## Suspension
//!
//! The target thread is an independently scheduled kernel thread; its
//! debug registers must not be rewritten while it runs. [`ThreadHandle::suspend`]
//! returns an RAII token whose drop resumes the thread, so every
//! read-modify-write happens inside one suspension scope.

use tracing::debug;

use crate::arch::DebugRegisters;
use crate::error::Result;
use crate::types::{ProcessKoid, ThreadKoid};

/// Token holding a thread suspended; dropping it resumes the thread.
///
/// Implementations wrap whatever the kernel hands out (a suspend token
/// object, a ptrace state, a test counter). The resource manager only ever
/// holds it for the duration of one register rewrite.
pub trait SuspendToken {}

/// Handle to one thread of an attached process.
pub trait ThreadHandle
{
    /// Kernel object id of the thread.
    fn koid(&self) -> ThreadKoid;

    /// Suspend the thread until the returned token is dropped.
    ///
    /// ## Errors
    ///
    /// - `ThreadGone`: the thread exited before it could be suspended
    /// - `SuspendFailed`: the kernel refused the suspension
    fn suspend(&self) -> Result<Box<dyn SuspendToken + '_>>;

    /// Read the thread's current debug-register state.
    fn read_debug_registers(&self) -> Result<DebugRegisters>;

    /// Write a debug-register state back to the thread.
    fn write_debug_registers(&self, regs: &DebugRegisters) -> Result<()>;
}

/// Handle to an attached process, used to resolve its live threads.
pub trait ProcessHandle
{
    /// Kernel object id of the process.
    fn koid(&self) -> ProcessKoid;

    /// All live threads of the process.
    fn threads(&self) -> Vec<&dyn ThreadHandle>;

    /// Look up one live thread by koid.
    fn thread(&self, koid: ThreadKoid) -> Option<&dyn ThreadHandle>;
}

/// Suspend `thread`, run `mutate` over a snapshot of its debug registers,
/// and write the result back.
///
/// The snapshot is only written back when `mutate` succeeds, so a codec
/// failure leaves the thread's register file untouched. The suspension is
/// held across the whole read-modify-write, making it atomic with respect
/// to the target thread.
pub fn with_suspended_registers<T>(
    thread: &dyn ThreadHandle,
    mutate: impl FnOnce(&mut DebugRegisters) -> Result<T>,
) -> Result<T>
{
    let _suspended = thread.suspend()?;
    let mut regs = thread.read_debug_registers()?;
    let value = mutate(&mut regs)?;
    thread.write_debug_registers(&regs)?;
    debug!(thread = %thread.koid(), "debug registers rewritten");
    Ok(value)
}
