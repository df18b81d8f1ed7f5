//! # Breakpoint Aggregate
//!
//! The user-facing breakpoint object: the declared settings plus hit
//! statistics, reconciled against per-process installations through a
//! [`BreakpointDelegate`].
//!
//! A `Breakpoint` never touches hardware itself. It diffs its declared
//! locations on every settings change and asks the delegate (the registry
//! owning the [`crate::process_breakpoint::ProcessBreakpoint`] entries) to
//! register or unregister (process, address) pairs. The delegate
//! reference-counts shared installations, so two breakpoints at the same
//! address in the same process share one set of debug-register slots.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::Result;
use crate::settings::{BreakpointSettings, BreakpointType};
use crate::types::{Address, BreakpointId, ProcessKoid, ThreadKoid};

/// Registry interface through which a breakpoint requests installation.
///
/// Implemented by the surrounding agent. `register_breakpoint` creates a
/// `ProcessBreakpoint` entry for (process, address) or adds this breakpoint
/// to the owner set of an existing one; `unregister_breakpoint` removes it
/// from the owner set and destroys the entry when the set empties.
pub trait BreakpointDelegate
{
    /// Add `id` as an owner of the installation at (process, address).
    fn register_breakpoint(&mut self, id: BreakpointId, process: ProcessKoid, address: Address) -> Result<()>;

    /// Remove `id` from the owner set of (process, address).
    fn unregister_breakpoint(&mut self, id: BreakpointId, process: ProcessKoid, address: Address);
}

/// Hit statistics reported back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointStats
{
    /// Client-assigned id of the breakpoint these stats belong to.
    pub id: BreakpointId,
    /// Number of times the breakpoint has been hit.
    pub hit_count: u32,
    /// Advisory flag: the breakpoint wants to be removed (one-shot hit).
    ///
    /// The object is not physically removed until the caller reaps it,
    /// which keeps iteration over an in-progress exception pass safe.
    pub should_delete: bool,
}

/// What the caller must do after a hit.
///
/// Returned from [`Breakpoint::on_hit`] so removal is handled explicitly
/// rather than inferred from the advisory flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome
{
    /// Nothing to do; the breakpoint stays armed.
    Continue,
    /// One-shot breakpoint fired; reap it on the next maintenance pass.
    RequestRemoval,
}

/// A user-declared breakpoint spanning any number of processes and threads.
#[derive(Debug)]
pub struct Breakpoint
{
    settings: BreakpointSettings,
    stats: BreakpointStats,
}

impl Breakpoint
{
    /// Create a breakpoint with no locations yet.
    #[must_use]
    pub fn new(id: BreakpointId, kind: BreakpointType) -> Self
    {
        Breakpoint {
            settings: BreakpointSettings::empty(id, kind),
            stats: BreakpointStats {
                id,
                hit_count: 0,
                should_delete: false,
            },
        }
    }

    /// Client-assigned id.
    #[must_use]
    pub fn id(&self) -> BreakpointId
    {
        self.settings.id
    }

    /// Currently declared settings.
    #[must_use]
    pub fn settings(&self) -> &BreakpointSettings
    {
        &self.settings
    }

    /// Hit statistics.
    #[must_use]
    pub fn stats(&self) -> &BreakpointStats
    {
        &self.stats
    }

    /// Replace the declared settings, reconciling installations.
    ///
    /// Computes the set difference between the previous and new locations
    /// keyed by (process, address). Newly absent locations are unregistered
    /// first (freeing slots before any are requested), then newly present
    /// ones registered. Unchanged locations are left untouched.
    ///
    /// Best-effort: a failed registration is logged and does not stop the
    /// remaining locations; the first failure is reported back so the
    /// settings-change reply can carry it. The new settings are kept either
    /// way, so the bookkeeping stays consistent with what the client
    /// declared.
    pub fn set_settings(&mut self, delegate: &mut dyn BreakpointDelegate, settings: BreakpointSettings) -> Result<()>
    {
        let old_keys: BTreeSet<(ProcessKoid, Address)> = self
            .settings
            .locations
            .iter()
            .map(|loc| (loc.process, loc.address))
            .collect();
        let new_keys: BTreeSet<(ProcessKoid, Address)> = settings
            .locations
            .iter()
            .map(|loc| (loc.process, loc.address))
            .collect();

        for &(process, address) in old_keys.difference(&new_keys) {
            delegate.unregister_breakpoint(self.settings.id, process, address);
        }

        let mut result = Ok(());
        for &(process, address) in new_keys.difference(&old_keys) {
            if let Err(err) = delegate.register_breakpoint(settings.id, process, address) {
                warn!(id = %settings.id, %process, %address, %err, "failed to register breakpoint location");
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        self.stats.id = settings.id;
        self.settings = settings;
        result
    }

    /// Record a hit.
    ///
    /// Increments the hit count; a one-shot breakpoint additionally raises
    /// the advisory `should_delete` flag and asks the caller to reap it.
    pub fn on_hit(&mut self) -> HitOutcome
    {
        self.stats.hit_count += 1;
        if self.settings.one_shot {
            self.stats.should_delete = true;
            return HitOutcome::RequestRemoval;
        }
        HitOutcome::Continue
    }

    /// Threads the installation at (process, address) should cover.
    ///
    /// Resolves this breakpoint's declared locations for that address:
    /// `None` means every thread of the process (some location carries the
    /// all-threads marker), otherwise the explicit set, which is empty when
    /// no location matches.
    #[must_use]
    pub fn threads_to_install(&self, process: ProcessKoid, address: Address) -> Option<BTreeSet<ThreadKoid>>
    {
        let mut threads = BTreeSet::new();
        for loc in &self.settings.locations {
            if loc.process != process || loc.address != address {
                continue;
            }
            match loc.thread {
                None => return None,
                Some(koid) => {
                    threads.insert(koid);
                }
            }
        }
        Some(threads)
    }

    /// Unregister every currently-held location.
    ///
    /// The explicit replacement for destructor side effects: the owner
    /// calls this before dropping the breakpoint, mirroring `set_settings`
    /// with an empty target set.
    pub fn teardown(&mut self, delegate: &mut dyn BreakpointDelegate)
    {
        for loc in self.settings.locations.drain(..) {
            delegate.unregister_breakpoint(self.settings.id, loc.process, loc.address);
        }
    }
}

/// Whether a breakpoint of kind `breakpoint_type` should be notified when
/// an exception raised by an installation of kind `exception_type` fires.
///
/// Software and hardware execution breakpoints only match their own kind.
/// A watch exception applies to every watchpoint kind: an installed
/// read-write watch matches read-write and write declarations, and an
/// installed write watch matches the write-compatible declarations (write
/// and read-write).
#[must_use]
pub fn does_exception_apply(exception_type: BreakpointType, breakpoint_type: BreakpointType) -> bool
{
    match exception_type {
        BreakpointType::Software => breakpoint_type == BreakpointType::Software,
        BreakpointType::Hardware => breakpoint_type == BreakpointType::Hardware,
        BreakpointType::ReadWrite | BreakpointType::Write => breakpoint_type.is_watchpoint(),
    }
}
