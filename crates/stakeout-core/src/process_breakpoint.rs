//! # Per-Process Breakpoint Installation
//!
//! The installed-state object for one (process, address) pair. Possibly
//! many [`crate::breakpoint::Breakpoint`] aggregates reference the same
//! address in the same process; they all share one `ProcessBreakpoint`,
//! tracked through its owner set. The registry that owns these entries
//! creates one when the first breakpoint references the pair and destroys
//! it when the owner set empties.
//!
//! ## Update Pass
//!
//! `update` recomputes the target thread set from the owning breakpoints'
//! declared locations, diffs it against the threads currently holding the
//! installation, and always uninstalls removed threads before installing
//! new ones so slot availability is evaluated under the post-uninstall
//! state. Per-thread collaborator failures are logged and skipped; the pass
//! never aborts because one thread raced an exit.

use std::collections::BTreeSet;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::allocator::HardwareSlotAllocator;
use crate::breakpoint::Breakpoint;
use crate::error::Result;
use crate::handles::{with_suspended_registers, ProcessHandle};
use crate::types::{Address, BreakpointId, ProcessKoid, ThreadKoid};

/// Hardware installation state for one (process, address) pair.
#[derive(Debug)]
pub struct ProcessBreakpoint
{
    process: ProcessKoid,
    address: Address,
    owners: BTreeSet<BreakpointId>,
    installed: BTreeSet<ThreadKoid>,
}

impl ProcessBreakpoint
{
    /// Create an uninitialized installation for (process, address).
    ///
    /// The caller must run [`ProcessBreakpoint::init`] before retaining it.
    #[must_use]
    pub fn new(process: ProcessKoid, address: Address) -> Self
    {
        ProcessBreakpoint {
            process,
            address,
            owners: BTreeSet::new(),
            installed: BTreeSet::new(),
        }
    }

    /// Process this installation lives in.
    #[must_use]
    pub fn process_koid(&self) -> ProcessKoid
    {
        self.process
    }

    /// Address this installation covers.
    #[must_use]
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Breakpoints currently sharing this installation.
    #[must_use]
    pub fn owners(&self) -> &BTreeSet<BreakpointId>
    {
        &self.owners
    }

    /// Threads currently holding the hardware installation.
    #[must_use]
    pub fn installed_threads(&self) -> &BTreeSet<ThreadKoid>
    {
        &self.installed
    }

    /// Add a breakpoint to the owner set.
    pub fn register_owner(&mut self, id: BreakpointId)
    {
        self.owners.insert(id);
    }

    /// Remove a breakpoint from the owner set.
    ///
    /// Returns `true` when no owners remain and the registry should run
    /// [`ProcessBreakpoint::uninstall_all`] and destroy the entry.
    pub fn unregister_owner(&mut self, id: BreakpointId) -> bool
    {
        self.owners.remove(&id);
        self.owners.is_empty()
    }

    /// First install pass.
    ///
    /// If this fails the instance is invalid and must not be retained; the
    /// registry reports the error through the settings-change reply.
    pub fn init(
        &mut self,
        owners: &[&Breakpoint],
        process: &dyn ProcessHandle,
        allocator: &HardwareSlotAllocator,
    ) -> Result<()>
    {
        for owner in owners {
            self.owners.insert(owner.id());
        }
        self.update(owners, process, allocator)
    }

    /// Reconcile the per-thread installations with the owners' settings.
    ///
    /// `owners` are the resolved aggregates for this entry's owner set. The
    /// pass is best-effort across threads: an exited or unresponsive thread
    /// is logged and skipped, and only operations that succeeded mutate the
    /// installed set. A codec-level failure (such as slot exhaustion) is
    /// reported after the pass finishes the remaining threads.
    pub fn update(
        &mut self,
        owners: &[&Breakpoint],
        process: &dyn ProcessHandle,
        allocator: &HardwareSlotAllocator,
    ) -> Result<()>
    {
        let desired = self.desired_threads(owners, process);

        // Uninstall before install: slots freed here may be the only ones
        // available for the installs below.
        let to_uninstall: SmallVec<[ThreadKoid; 8]> = self
            .installed
            .iter()
            .filter(|koid| !desired.contains(*koid))
            .copied()
            .collect();
        for koid in to_uninstall {
            self.uninstall_thread(koid, process, allocator);
        }

        let mut result = Ok(());
        let to_install: SmallVec<[ThreadKoid; 8]> = desired
            .iter()
            .filter(|koid| !self.installed.contains(*koid))
            .copied()
            .collect();
        for koid in to_install {
            let Some(thread) = process.thread(koid) else {
                // Exited between enumeration and now; nothing to install on.
                continue;
            };
            match with_suspended_registers(thread, |regs| allocator.setup_breakpoint(regs, self.address)) {
                Ok(()) => {
                    debug!(%koid, address = %self.address, "hardware breakpoint installed");
                    self.installed.insert(koid);
                }
                Err(err) if err.is_thread_failure() => {
                    warn!(%koid, address = %self.address, %err, "skipping thread for breakpoint install");
                }
                Err(err) => {
                    warn!(%koid, address = %self.address, %err, "breakpoint install failed");
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
            }
        }
        result
    }

    /// Force-uninstall from every thread still holding the installation.
    ///
    /// Used when the entry is destroyed. Failures are logged, never
    /// propagated: the installation is going away regardless.
    pub fn uninstall_all(&mut self, process: &dyn ProcessHandle, allocator: &HardwareSlotAllocator)
    {
        let installed: SmallVec<[ThreadKoid; 8]> = self.installed.iter().copied().collect();
        for koid in installed {
            self.uninstall_thread(koid, process, allocator);
        }
    }

    /// Resolve the thread set the owners want this installation on.
    fn desired_threads(&self, owners: &[&Breakpoint], process: &dyn ProcessHandle) -> BTreeSet<ThreadKoid>
    {
        let mut explicit = BTreeSet::new();
        for owner in owners {
            match owner.threads_to_install(self.process, self.address) {
                // Some owner wants every thread of the process.
                None => {
                    return process.threads().iter().map(|thread| thread.koid()).collect();
                }
                Some(threads) => explicit.extend(threads),
            }
        }
        explicit
    }

    /// Remove the installation from one thread, dropping it from the
    /// installed set even when the hardware operation fails (an exited
    /// thread took its register file with it).
    fn uninstall_thread(&mut self, koid: ThreadKoid, process: &dyn ProcessHandle, allocator: &HardwareSlotAllocator)
    {
        if let Some(thread) = process.thread(koid) {
            match with_suspended_registers(thread, |regs| allocator.remove_breakpoint(regs, self.address)) {
                Ok(()) => debug!(%koid, address = %self.address, "hardware breakpoint removed"),
                Err(err) => {
                    warn!(%koid, address = %self.address, %err, "failed to remove hardware breakpoint");
                }
            }
        }
        self.installed.remove(&koid);
    }
}
