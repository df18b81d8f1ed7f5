//! # Watchpoint Aggregate
//!
//! The user-facing watchpoint object. Same shape as
//! [`crate::breakpoint::Breakpoint`] but keyed on (process, range), and
//! ranges are not deduplicated across watchpoints: each declared range gets
//! its own [`crate::process_watchpoint::ProcessWatchpoint`] entry with a
//! single owner.

use std::collections::BTreeSet;

use tracing::warn;

use crate::arch::WatchAccess;
use crate::breakpoint::{BreakpointStats, HitOutcome};
use crate::error::Result;
use crate::settings::{BreakpointType, WatchpointSettings};
use crate::types::{AddressRange, BreakpointId, ProcessKoid, ThreadKoid};

/// Registry interface through which a watchpoint requests installation.
pub trait WatchpointDelegate
{
    /// Create the `ProcessWatchpoint` entry for (process, range), owned by
    /// `id`.
    fn register_watchpoint(&mut self, id: BreakpointId, process: ProcessKoid, range: AddressRange) -> Result<()>;

    /// Destroy the `ProcessWatchpoint` entry for (process, range).
    fn unregister_watchpoint(&mut self, id: BreakpointId, process: ProcessKoid, range: AddressRange);
}

/// A user-declared watchpoint spanning any number of processes and threads.
#[derive(Debug)]
pub struct Watchpoint
{
    settings: WatchpointSettings,
    stats: BreakpointStats,
}

impl Watchpoint
{
    /// Create a watchpoint with no locations yet.
    ///
    /// `kind` must be a watchpoint kind; it is validated when settings are
    /// applied and when an access type is derived.
    #[must_use]
    pub fn new(id: BreakpointId, kind: BreakpointType) -> Self
    {
        Watchpoint {
            settings: WatchpointSettings::empty(id, kind),
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
    pub fn settings(&self) -> &WatchpointSettings
    {
        &self.settings
    }

    /// Hit statistics.
    #[must_use]
    pub fn stats(&self) -> &BreakpointStats
    {
        &self.stats
    }

    /// Hardware access type this watchpoint arms slots with.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: the declared kind is not a watchpoint kind
    pub fn watch_access(&self) -> Result<WatchAccess>
    {
        self.settings.kind.watch_access()
    }

    /// Replace the declared settings, reconciling installations.
    ///
    /// Same diff shape as `Breakpoint::set_settings`, keyed on
    /// (process, range): removed ranges are unregistered before new ones
    /// are registered, unchanged ranges are untouched, and a failed
    /// registration is logged and reported without stopping the rest.
    pub fn set_settings(&mut self, delegate: &mut dyn WatchpointDelegate, settings: WatchpointSettings) -> Result<()>
    {
        let old_keys: BTreeSet<(ProcessKoid, AddressRange)> = self
            .settings
            .locations
            .iter()
            .map(|loc| (loc.process, loc.range))
            .collect();
        let new_keys: BTreeSet<(ProcessKoid, AddressRange)> = settings
            .locations
            .iter()
            .map(|loc| (loc.process, loc.range))
            .collect();

        for &(process, range) in old_keys.difference(&new_keys) {
            delegate.unregister_watchpoint(self.settings.id, process, range);
        }

        let mut result = Ok(());
        for &(process, range) in new_keys.difference(&old_keys) {
            if let Err(err) = delegate.register_watchpoint(settings.id, process, range) {
                warn!(id = %settings.id, %process, %range, %err, "failed to register watchpoint location");
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        self.stats.id = settings.id;
        self.settings = settings;
        result
    }

    /// Record a hit; one-shot watchpoints request removal like breakpoints.
    pub fn on_hit(&mut self) -> HitOutcome
    {
        self.stats.hit_count += 1;
        if self.settings.one_shot {
            self.stats.should_delete = true;
            return HitOutcome::RequestRemoval;
        }
        HitOutcome::Continue
    }

    /// Threads the installations in `process` should cover.
    ///
    /// `None` means every thread of the process (some declared location
    /// carries the all-threads marker); otherwise the explicit set, empty
    /// when no location names the process.
    #[must_use]
    pub fn threads_to_install(&self, process: ProcessKoid) -> Option<BTreeSet<ThreadKoid>>
    {
        let mut threads = BTreeSet::new();
        for loc in &self.settings.locations {
            if loc.process != process {
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
    /// The explicit replacement for destructor side effects, mirroring
    /// `set_settings` with an empty target set.
    pub fn teardown(&mut self, delegate: &mut dyn WatchpointDelegate)
    {
        for loc in self.settings.locations.drain(..) {
            delegate.unregister_watchpoint(self.settings.id, loc.process, loc.range);
        }
    }
}
