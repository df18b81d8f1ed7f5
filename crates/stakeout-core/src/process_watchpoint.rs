//! # Per-Process Watchpoint Installation
//!
//! The installed-state object for one (process, range) pair. Unlike
//! breakpoints, ranges are not deduplicated across watchpoint aggregates:
//! every declared range gets its own entry with exactly one owner.
//!
//! The hardware may install a window wider than the declared range (the
//! ARM64 codec widens to an aligned window and narrows back with the BAS
//! mask), so the entry records the actually-installed range per thread and
//! keys removal on it.

use std::collections::BTreeMap;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::allocator::HardwareSlotAllocator;
use crate::error::Result;
use crate::handles::{with_suspended_registers, ProcessHandle};
use crate::types::{AddressRange, BreakpointId, ProcessKoid, ThreadKoid};
use crate::watchpoint::Watchpoint;

/// Hardware installation state for one (process, range) pair.
#[derive(Debug)]
pub struct ProcessWatchpoint
{
    process: ProcessKoid,
    range: AddressRange,
    owner: BreakpointId,
    /// Threads currently holding the installation, with the range the
    /// hardware actually covers on each.
    installed: BTreeMap<ThreadKoid, AddressRange>,
}

impl ProcessWatchpoint
{
    /// Create an uninitialized installation for (process, range) owned by
    /// `owner`.
    ///
    /// The caller must run [`ProcessWatchpoint::init`] before retaining it.
    #[must_use]
    pub fn new(owner: BreakpointId, process: ProcessKoid, range: AddressRange) -> Self
    {
        ProcessWatchpoint {
            process,
            range,
            owner,
            installed: BTreeMap::new(),
        }
    }

    /// Process this installation lives in.
    #[must_use]
    pub fn process_koid(&self) -> ProcessKoid
    {
        self.process
    }

    /// Declared range this installation covers.
    #[must_use]
    pub fn range(&self) -> AddressRange
    {
        self.range
    }

    /// The watchpoint aggregate owning this installation.
    #[must_use]
    pub fn owner(&self) -> BreakpointId
    {
        self.owner
    }

    /// Threads currently holding the installation and the hardware range
    /// each one carries.
    #[must_use]
    pub fn installed_threads(&self) -> &BTreeMap<ThreadKoid, AddressRange>
    {
        &self.installed
    }

    /// First install pass.
    ///
    /// If this fails the instance is invalid and must not be retained.
    pub fn init(
        &mut self,
        owner: &Watchpoint,
        process: &dyn ProcessHandle,
        allocator: &HardwareSlotAllocator,
    ) -> Result<()>
    {
        self.update(owner, process, allocator)
    }

    /// Reconcile the per-thread installations with the owner's settings.
    ///
    /// Recomputes the target thread set (resolving the all-threads marker
    /// against the live thread list), uninstalls removed threads before
    /// installing new ones, and only mutates the installed map for
    /// operations that succeeded. Exited or unresponsive threads are
    /// logged and skipped; codec-level failures are reported after the
    /// remaining threads finish.
    pub fn update(
        &mut self,
        owner: &Watchpoint,
        process: &dyn ProcessHandle,
        allocator: &HardwareSlotAllocator,
    ) -> Result<()>
    {
        let access = owner.watch_access()?;

        let desired: SmallVec<[ThreadKoid; 8]> = match owner.threads_to_install(self.process) {
            None => process.threads().iter().map(|thread| thread.koid()).collect(),
            Some(explicit) => explicit.into_iter().collect(),
        };

        // Uninstall before install: watch slots are scarce, and the slots
        // freed here may be the only ones available below.
        let to_uninstall: SmallVec<[ThreadKoid; 8]> = self
            .installed
            .keys()
            .filter(|koid| !desired.contains(*koid))
            .copied()
            .collect();
        for koid in to_uninstall {
            self.uninstall_thread(koid, process, allocator);
        }

        let mut result = Ok(());
        for koid in desired {
            if self.installed.contains_key(&koid) {
                continue;
            }
            let Some(thread) = process.thread(koid) else {
                // Exited between enumeration and now; nothing to install on.
                continue;
            };
            match with_suspended_registers(thread, |regs| allocator.setup_watchpoint(regs, self.range, access)) {
                Ok(installation) => {
                    debug!(%koid, range = %self.range, installed = %installation.range, slot = installation.slot,
                        "watchpoint installed");
                    self.installed.insert(koid, installation.range);
                }
                Err(err) if err.is_thread_failure() => {
                    warn!(%koid, range = %self.range, %err, "skipping thread for watchpoint install");
                }
                Err(err) => {
                    warn!(%koid, range = %self.range, %err, "watchpoint install failed");
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
    /// propagated: the owning watchpoint is going away regardless.
    pub fn uninstall_all(&mut self, process: &dyn ProcessHandle, allocator: &HardwareSlotAllocator)
    {
        let installed: SmallVec<[ThreadKoid; 8]> = self.installed.keys().copied().collect();
        for koid in installed {
            self.uninstall_thread(koid, process, allocator);
        }
    }

    /// Remove the installation from one thread, keyed on the range the
    /// hardware actually holds there. The bookkeeping entry goes away even
    /// when the hardware operation fails.
    fn uninstall_thread(&mut self, koid: ThreadKoid, process: &dyn ProcessHandle, allocator: &HardwareSlotAllocator)
    {
        let Some(installed_range) = self.installed.get(&koid).copied() else {
            return;
        };
        if let Some(thread) = process.thread(koid) {
            match with_suspended_registers(thread, |regs| allocator.remove_watchpoint(regs, installed_range)) {
                Ok(()) => debug!(%koid, range = %installed_range, "watchpoint removed"),
                Err(err) => {
                    warn!(%koid, range = %installed_range, %err, "failed to remove watchpoint");
                }
            }
        }
        self.installed.remove(&koid);
    }
}
