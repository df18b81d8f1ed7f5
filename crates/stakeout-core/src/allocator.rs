//! # Hardware Slot Allocator
//!
//! Thin policy layer over the per-architecture codecs.
//!
//! The codec functions are pure and take the usable slot count as a
//! parameter; this type binds that count to the live hardware descriptor
//! read once at process-attach time (real slot counts vary by CPU model,
//! especially on ARM64) and dispatches over the [`DebugRegisters`] enum so
//! callers never name an architecture after attach.
//!
//! One allocator instance exists per attached process and is passed into
//! every component that mutates debug registers; there is no process-wide
//! singleton to swap out for tests.

use crate::arch::{self, Architecture, DebugRegisters, WatchAccess, WatchpointInstallation};
use crate::error::{Result, StakeoutError};
use crate::types::{Address, AddressRange};

/// Allocation policy for one attached process.
///
/// Holds the architecture selected at attach time and the usable slot
/// counts reported by the hardware, clamped to the architectural maxima.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareSlotAllocator
{
    arch: Architecture,
    hw_breakpoint_count: usize,
    watchpoint_count: usize,
}

impl HardwareSlotAllocator
{
    /// Create an allocator from the hardware descriptor of an attached
    /// process.
    ///
    /// Counts beyond what the architecture can express are clamped; a CPU
    /// reporting 20 ARM64 watchpoint slots still yields 16 usable ones.
    #[must_use]
    pub fn new(arch: Architecture, hw_breakpoint_count: usize, watchpoint_count: usize) -> Self
    {
        HardwareSlotAllocator {
            arch,
            hw_breakpoint_count: hw_breakpoint_count.min(arch.max_hw_breakpoints()),
            watchpoint_count: watchpoint_count.min(arch.max_watchpoints()),
        }
    }

    /// Allocator for an x86-64 process (the slot count is architectural).
    #[must_use]
    pub fn x64() -> Self
    {
        Self::new(Architecture::X64, arch::x64::MAX_HW_SLOTS, arch::x64::MAX_HW_SLOTS)
    }

    /// Architecture this allocator encodes for.
    #[must_use]
    pub const fn architecture(&self) -> Architecture
    {
        self.arch
    }

    /// Usable hardware breakpoint slots per thread.
    #[must_use]
    pub const fn hw_breakpoint_count(&self) -> usize
    {
        self.hw_breakpoint_count
    }

    /// Usable watchpoint slots per thread.
    #[must_use]
    pub const fn watchpoint_count(&self) -> usize
    {
        self.watchpoint_count
    }

    /// Fresh all-zero snapshot matching this allocator's architecture.
    #[must_use]
    pub fn empty_registers(&self) -> DebugRegisters
    {
        DebugRegisters::empty(self.arch)
    }

    /// Install an execution breakpoint at `address` into `regs`.
    pub fn setup_breakpoint(&self, regs: &mut DebugRegisters, address: Address) -> Result<()>
    {
        match (self.arch, regs) {
            (Architecture::X64, DebugRegisters::X64(regs)) => {
                arch::x64::setup_hw_breakpoint(regs, address, self.hw_breakpoint_count)
            }
            (Architecture::Arm64, DebugRegisters::Arm64(regs)) => {
                arch::arm64::setup_hw_breakpoint(regs, address, self.hw_breakpoint_count)
            }
            (arch, regs) => Err(Self::arch_mismatch(arch, regs)),
        }
    }

    /// Remove the execution breakpoint at `address` from `regs`.
    pub fn remove_breakpoint(&self, regs: &mut DebugRegisters, address: Address) -> Result<()>
    {
        match (self.arch, regs) {
            (Architecture::X64, DebugRegisters::X64(regs)) => {
                arch::x64::remove_hw_breakpoint(regs, address, self.hw_breakpoint_count)
            }
            (Architecture::Arm64, DebugRegisters::Arm64(regs)) => {
                arch::arm64::remove_hw_breakpoint(regs, address, self.hw_breakpoint_count)
            }
            (arch, regs) => Err(Self::arch_mismatch(arch, regs)),
        }
    }

    /// Install a watchpoint over `range` into `regs`.
    ///
    /// Returns the installed (hardware-aligned) range and slot; removal
    /// must be keyed on that range.
    pub fn setup_watchpoint(
        &self,
        regs: &mut DebugRegisters,
        range: AddressRange,
        access: WatchAccess,
    ) -> Result<WatchpointInstallation>
    {
        match (self.arch, regs) {
            (Architecture::X64, DebugRegisters::X64(regs)) => {
                arch::x64::setup_watchpoint(regs, range, access, self.watchpoint_count)
            }
            (Architecture::Arm64, DebugRegisters::Arm64(regs)) => {
                arch::arm64::setup_watchpoint(regs, range, access, self.watchpoint_count)
            }
            (arch, regs) => Err(Self::arch_mismatch(arch, regs)),
        }
    }

    /// Remove the watchpoint whose installed range matches `range`.
    pub fn remove_watchpoint(&self, regs: &mut DebugRegisters, range: AddressRange) -> Result<()>
    {
        match (self.arch, regs) {
            (Architecture::X64, DebugRegisters::X64(regs)) => {
                arch::x64::remove_watchpoint(regs, range, self.watchpoint_count)
            }
            (Architecture::Arm64, DebugRegisters::Arm64(regs)) => {
                arch::arm64::remove_watchpoint(regs, range, self.watchpoint_count)
            }
            (arch, regs) => Err(Self::arch_mismatch(arch, regs)),
        }
    }

    fn arch_mismatch(arch: Architecture, regs: &DebugRegisters) -> StakeoutError
    {
        StakeoutError::InvalidArgument(format!(
            "register snapshot is {} but the process attached as {arch}",
            regs.architecture()
        ))
    }
}
