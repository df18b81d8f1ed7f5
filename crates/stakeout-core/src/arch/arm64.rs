//! # ARM64 Debug Register Codec
//!
//! Encoding of hardware breakpoints and watchpoints into the
//! DBGBCR/DBGBVR and DBGWCR/DBGWVR register files.
//!
//! ## Register Layout
//!
//! Breakpoint control (DBGBCR):
//! - bit 0: E (enable)
//! - bits 1-2: PMC (privilege mode control, `0b10` = EL0 only)
//! - bits 5-8: BAS (`0b1111` matches the whole A64 instruction)
//!
//! Watchpoint control (DBGWCR):
//! - bit 0: E (enable)
//! - bits 1-2: PAC (privilege access control, `0b10` = EL0 only)
//! - bits 3-4: LSC (`0b10` store, `0b11` load and store)
//! - bits 5-12: BAS (byte address select, one bit per byte of the
//!   doubleword at DBGWVR)
//!
//! ## Byte Address Select
//!
//! DBGWVR holds a doubleword-aligned base; BAS bit `i` arms byte `base + i`.
//! Bit `i` is set iff that byte is part of the originally requested range,
//! so a 2-byte request at an address with low bits `10` encodes as BAS
//! `0b00001100`. The aligned window reported back to the caller may be a
//! superset of the request (a 3-byte request occupies a 4-byte window), and
//! removal is matched on that aligned window.
//!
//! The architecture exposes up to 16 slots of each kind; how many are
//! usable on the running CPU comes from the hardware descriptor and is
//! passed in as `slot_count`.

use crate::arch::{WatchAccess, WatchpointInstallation};
use crate::error::{Result, StakeoutError};
use crate::types::{Address, AddressRange};

/// Architectural maximum number of hardware breakpoint slots.
pub const MAX_HW_BREAKPOINTS: usize = 16;
/// Architectural maximum number of watchpoint slots.
pub const MAX_WATCHPOINTS: usize = 16;

/// DBGBCR/DBGWCR enable bit.
const CTRL_E: u32 = 1;
/// PMC/PAC field selecting EL0-only matching, already shifted.
const CTRL_EL0_ONLY: u32 = 0b10 << 1;
/// DBGBCR BAS field matching the whole A64 instruction, already shifted.
const BCR_BAS_ALL: u32 = 0b1111 << 5;
/// DBGWCR LSC field: trigger on stores.
const WCR_LSC_STORE: u32 = 0b10 << 3;
/// DBGWCR LSC field: trigger on loads and stores.
const WCR_LSC_LOAD_STORE: u32 = 0b11 << 3;
/// Shift of the DBGWCR BAS field.
const WCR_BAS_SHIFT: u32 = 5;

/// One hardware breakpoint slot (control + value register pair).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Arm64HwBreakpoint
{
    /// DBGBCR<n> control register.
    pub dbgbcr: u32,
    /// DBGBVR<n> value register (the breakpoint address).
    pub dbgbvr: u64,
}

/// One watchpoint slot (control + value register pair).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Arm64Watchpoint
{
    /// DBGWCR<n> control register.
    pub dbgwcr: u32,
    /// DBGWVR<n> value register (doubleword-aligned base address).
    pub dbgwvr: u64,
}

/// ARM64 debug-register snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Arm64DebugRegs
{
    /// Hardware breakpoint slots.
    pub hw_bps: [Arm64HwBreakpoint; MAX_HW_BREAKPOINTS],
    /// Watchpoint slots.
    pub hw_wps: [Arm64Watchpoint; MAX_WATCHPOINTS],
}

impl Arm64DebugRegs
{
    /// Whether breakpoint slot `slot` is enabled.
    #[must_use]
    pub fn breakpoint_enabled(&self, slot: usize) -> bool
    {
        self.hw_bps[slot].dbgbcr & CTRL_E != 0
    }

    /// Whether watchpoint slot `slot` is enabled.
    #[must_use]
    pub fn watchpoint_enabled(&self, slot: usize) -> bool
    {
        self.hw_wps[slot].dbgwcr & CTRL_E != 0
    }

    /// BAS field of watchpoint slot `slot`.
    #[must_use]
    pub fn watchpoint_bas(&self, slot: usize) -> u8
    {
        ((self.hw_wps[slot].dbgwcr >> WCR_BAS_SHIFT) & 0xFF) as u8
    }

    /// The exact bytes watchpoint slot `slot` is armed for.
    ///
    /// Decoded from DBGWVR plus the BAS run; `None` for a disabled slot.
    #[must_use]
    pub fn watched_range(&self, slot: usize) -> Option<AddressRange>
    {
        if !self.watchpoint_enabled(slot) {
            return None;
        }
        let bas = u32::from(self.watchpoint_bas(slot));
        if bas == 0 {
            return None;
        }
        let base = self.hw_wps[slot].dbgwvr + u64::from(bas.trailing_zeros());
        Some(AddressRange::from_base_and_size(
            Address::new(base),
            u64::from(bas.count_ones()),
        ))
    }

    /// The aligned window watchpoint slot `slot` occupies.
    ///
    /// This is the range install/remove are matched on.
    #[must_use]
    pub fn installed_range(&self, slot: usize) -> Option<AddressRange>
    {
        self.watched_range(slot).and_then(align_watch_range)
    }
}

/// Compute the minimal hardware-representable window covering `range`.
///
/// The window size is the request length rounded up to a power of two in
/// {1, 2, 4, 8} and the base is aligned down to that size. Returns `None`
/// when no such window covers the request: a length over 8 bytes, an empty
/// range, or a base whose misalignment pushes the request across the window
/// boundary (2 bytes at an odd address has no 2-byte window).
#[must_use]
pub fn align_watch_range(range: AddressRange) -> Option<AddressRange>
{
    let len = range.size();
    if len == 0 || len > 8 {
        return None;
    }
    let size = len.next_power_of_two();
    let base = range.begin().align_down(size);
    if base.value() + size < range.end().value() {
        return None;
    }
    Some(AddressRange::from_base_and_size(base, size))
}

/// Install an execution breakpoint at `address`.
///
/// Idempotent when `address` is already installed; otherwise the first
/// disabled slot (lowest index wins) takes it.
///
/// ## Errors
///
/// - `InvalidArgument`: `address` is not 4-byte aligned (A64 instructions
///   always are)
/// - `ResourceExhausted`: no disabled slot among the first `slot_count`
pub fn setup_hw_breakpoint(regs: &mut Arm64DebugRegs, address: Address, slot_count: usize) -> Result<()>
{
    let slot_count = slot_count.min(MAX_HW_BREAKPOINTS);

    if address.value() % 4 != 0 {
        return Err(StakeoutError::InvalidArgument(format!(
            "breakpoint address {address} is not instruction-aligned"
        )));
    }

    for slot in 0..slot_count {
        if regs.breakpoint_enabled(slot) && regs.hw_bps[slot].dbgbvr == address.value() {
            return Ok(());
        }
    }

    let slot = (0..slot_count)
        .find(|&slot| !regs.breakpoint_enabled(slot))
        .ok_or_else(|| {
            StakeoutError::ResourceExhausted(format!(
                "no free breakpoint slot for {address} (all {slot_count} in use)"
            ))
        })?;

    regs.hw_bps[slot].dbgbvr = address.value();
    regs.hw_bps[slot].dbgbcr = CTRL_E | CTRL_EL0_ONLY | BCR_BAS_ALL;
    Ok(())
}

/// Remove the execution breakpoint at `address`.
///
/// ## Errors
///
/// - `BreakpointNotInstalled`: no enabled slot holds `address`
pub fn remove_hw_breakpoint(regs: &mut Arm64DebugRegs, address: Address, slot_count: usize) -> Result<()>
{
    let slot_count = slot_count.min(MAX_HW_BREAKPOINTS);

    for slot in 0..slot_count {
        if regs.breakpoint_enabled(slot) && regs.hw_bps[slot].dbgbvr == address.value() {
            regs.hw_bps[slot] = Arm64HwBreakpoint::default();
            return Ok(());
        }
    }
    Err(StakeoutError::BreakpointNotInstalled(address))
}

/// Install a watchpoint over `range`.
///
/// The request is widened to its aligned window (see [`align_watch_range`]);
/// the BAS mask is computed from the original request so only the bytes the
/// caller asked for are armed.
///
/// ## Errors
///
/// - `UnrepresentableRange`: no aligned window covers `range`
/// - `AlreadyBound`: an enabled slot already occupies the same window
/// - `ResourceExhausted`: all `slot_count` slots in use
pub fn setup_watchpoint(
    regs: &mut Arm64DebugRegs,
    range: AddressRange,
    access: WatchAccess,
    slot_count: usize,
) -> Result<WatchpointInstallation>
{
    let slot_count = slot_count.min(MAX_WATCHPOINTS);

    let aligned = align_watch_range(range).ok_or(StakeoutError::UnrepresentableRange(range))?;

    for slot in 0..slot_count {
        if regs.installed_range(slot) == Some(aligned) {
            return Err(StakeoutError::AlreadyBound(aligned));
        }
    }

    let slot = (0..slot_count)
        .find(|&slot| !regs.watchpoint_enabled(slot))
        .ok_or_else(|| {
            StakeoutError::ResourceExhausted(format!(
                "no free watchpoint slot for {range} (all {slot_count} in use)"
            ))
        })?;

    let lsc = match access {
        WatchAccess::Write => WCR_LSC_STORE,
        WatchAccess::ReadWrite => WCR_LSC_LOAD_STORE,
    };

    // BAS is relative to the doubleword DBGWVR points at; the aligned window
    // never straddles a doubleword boundary.
    let doubleword = range.begin().align_down(8);
    let bas = ((1u32 << range.size()) - 1) << (range.begin().value() % 8);

    regs.hw_wps[slot].dbgwvr = doubleword.value();
    regs.hw_wps[slot].dbgwcr = CTRL_E | CTRL_EL0_ONLY | lsc | (bas << WCR_BAS_SHIFT);

    Ok(WatchpointInstallation { slot, range: aligned })
}

/// Remove the watchpoint whose installed window matches `range`.
///
/// `range` is aligned the same way setup aligned it, so callers may pass
/// either the installed range they were handed back or the original
/// request.
///
/// ## Errors
///
/// - `UnrepresentableRange`: `range` aligns to no hardware window
/// - `WatchpointNotInstalled`: no enabled slot occupies that window
pub fn remove_watchpoint(regs: &mut Arm64DebugRegs, range: AddressRange, slot_count: usize) -> Result<()>
{
    let slot_count = slot_count.min(MAX_WATCHPOINTS);

    let aligned = align_watch_range(range).ok_or(StakeoutError::UnrepresentableRange(range))?;

    for slot in 0..slot_count {
        if regs.installed_range(slot) == Some(aligned) {
            regs.hw_wps[slot] = Arm64Watchpoint::default();
            return Ok(());
        }
    }
    Err(StakeoutError::WatchpointNotInstalled(range))
}

/// Resolve a watchpoint exception's fault address to the slot that armed it.
///
/// Scans the enabled slots for one whose armed bytes contain `fault`,
/// lowest index first. Returns `None` when the fault address matches no
/// armed byte (e.g. the exception came from a breakpoint instead).
#[must_use]
pub fn watchpoint_slot_for_fault(regs: &Arm64DebugRegs, fault: Address, slot_count: usize) -> Option<usize>
{
    let slot_count = slot_count.min(MAX_WATCHPOINTS);
    (0..slot_count).find(|&slot| {
        regs.watched_range(slot)
            .is_some_and(|watched| watched.contains(fault))
    })
}
