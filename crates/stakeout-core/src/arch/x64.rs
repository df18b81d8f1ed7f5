//! # x86-64 Debug Register Codec
//!
//! Encoding of hardware breakpoints and watchpoints into the DR0-DR7
//! register file.
//!
//! ## Register Layout
//!
//! - **DR0-DR3**: linear addresses, one per slot
//! - **DR6**: status; bits B0-B3 record which slot triggered the last debug
//!   exception
//! - **DR7**: control; per slot `n`:
//!   - bit `2n`: Ln (local enable)
//!   - bit `2n+1`: Gn (global enable, unused here)
//!   - bits `16+4n..=17+4n`: RWn (`00` execute, `01` write, `11` read/write)
//!   - bits `18+4n..=19+4n`: LENn (`00` 1 byte, `01` 2 bytes, `11` 4 bytes,
//!     `10` 8 bytes)
//!
//! The four slots are one physical pool: an execution breakpoint and a
//! watchpoint compete for the same registers. A slot is free iff its L bit
//! is clear; the kind of an enabled slot is read back out of its RW field.
//!
//! Watch ranges are exact on this architecture: 1, 2, 4, or 8 bytes with a
//! size-aligned base. There is no byte-select narrowing like ARM64's BAS, so
//! a range no aligned window matches exactly cannot be encoded.

use crate::arch::{WatchAccess, WatchpointInstallation};
use crate::error::{Result, StakeoutError};
use crate::types::{Address, AddressRange};

/// Number of physical debug-register slots (DR0-DR3).
pub const MAX_HW_SLOTS: usize = 4;

/// RW field value for an execution breakpoint.
const RW_EXECUTE: u64 = 0b00;
/// RW field value for a write watchpoint.
const RW_WRITE: u64 = 0b01;
/// RW field value for a read/write watchpoint.
const RW_READ_WRITE: u64 = 0b11;

/// x86-64 debug-register snapshot.
///
/// A plain value type; all mutation goes through the functions in this
/// module.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct X64DebugRegs
{
    /// DR0-DR3 address registers.
    pub dr: [u64; MAX_HW_SLOTS],
    /// DR6 status register.
    pub dr6: u64,
    /// DR7 control register.
    pub dr7: u64,
}

impl X64DebugRegs
{
    /// Whether slot `slot` is enabled (its L bit is set).
    #[must_use]
    pub fn slot_enabled(&self, slot: usize) -> bool
    {
        self.dr7 & l_bit(slot) != 0
    }

    /// RW field of slot `slot`.
    fn rw(&self, slot: usize) -> u64
    {
        (self.dr7 >> rw_shift(slot)) & 0b11
    }

    /// Watched length of slot `slot`, decoded from its LEN field.
    fn len(&self, slot: usize) -> u64
    {
        match (self.dr7 >> len_shift(slot)) & 0b11 {
            0b00 => 1,
            0b01 => 2,
            0b11 => 4,
            0b10 => 8,
            _ => unreachable!(),
        }
    }

    /// Whether slot `slot` holds an enabled execution breakpoint.
    fn is_enabled_breakpoint(&self, slot: usize) -> bool
    {
        self.slot_enabled(slot) && self.rw(slot) == RW_EXECUTE
    }

    /// Whether slot `slot` holds an enabled watchpoint.
    fn is_enabled_watchpoint(&self, slot: usize) -> bool
    {
        self.slot_enabled(slot) && self.rw(slot) != RW_EXECUTE
    }

    /// The range an enabled watch slot covers.
    fn watch_range(&self, slot: usize) -> AddressRange
    {
        AddressRange::from_base_and_size(Address::new(self.dr[slot]), self.len(slot))
    }

    /// Clear slot `slot` completely (address, enable bit, RW/LEN fields).
    fn clear_slot(&mut self, slot: usize)
    {
        self.dr[slot] = 0;
        self.dr7 &= !l_bit(slot);
        self.dr7 &= !(0xF << rw_shift(slot));
    }
}

const fn l_bit(slot: usize) -> u64
{
    1 << (slot * 2)
}

const fn rw_shift(slot: usize) -> u64
{
    16 + (slot as u64) * 4
}

const fn len_shift(slot: usize) -> u64
{
    18 + (slot as u64) * 4
}

/// LEN field encoding for a watch size in bytes.
fn encode_len(size: u64) -> Option<u64>
{
    match size {
        1 => Some(0b00),
        2 => Some(0b01),
        4 => Some(0b11),
        8 => Some(0b10),
        _ => None,
    }
}

/// Install an execution breakpoint at `address`.
///
/// Scans the enabled breakpoint slots first: if `address` is already
/// installed the call is an idempotent no-op. Otherwise the first disabled
/// slot (lowest index wins) takes the address.
///
/// ## Errors
///
/// - `ResourceExhausted`: no disabled slot among the first `slot_count`
pub fn setup_hw_breakpoint(regs: &mut X64DebugRegs, address: Address, slot_count: usize) -> Result<()>
{
    let slot_count = slot_count.min(MAX_HW_SLOTS);

    for slot in 0..slot_count {
        if regs.is_enabled_breakpoint(slot) && regs.dr[slot] == address.value() {
            return Ok(());
        }
    }

    let slot = (0..slot_count)
        .find(|&slot| !regs.slot_enabled(slot))
        .ok_or_else(|| {
            StakeoutError::ResourceExhausted(format!(
                "no free debug-register slot for breakpoint at {address} (all {slot_count} in use)"
            ))
        })?;

    regs.dr[slot] = address.value();
    regs.dr7 |= l_bit(slot);
    // RW=00 (execute) and LEN=00 (1 byte).
    regs.dr7 &= !(0xF << rw_shift(slot));
    Ok(())
}

/// Remove the execution breakpoint at `address`.
///
/// ## Errors
///
/// - `BreakpointNotInstalled`: no enabled breakpoint slot holds `address`
pub fn remove_hw_breakpoint(regs: &mut X64DebugRegs, address: Address, slot_count: usize) -> Result<()>
{
    let slot_count = slot_count.min(MAX_HW_SLOTS);

    for slot in 0..slot_count {
        if regs.is_enabled_breakpoint(slot) && regs.dr[slot] == address.value() {
            regs.clear_slot(slot);
            return Ok(());
        }
    }
    Err(StakeoutError::BreakpointNotInstalled(address))
}

/// Install a watchpoint over `range`.
///
/// The range must be exactly representable: 1, 2, 4, or 8 bytes with a base
/// aligned to the size. The installed range always equals the request on
/// this architecture.
///
/// ## Errors
///
/// - `UnrepresentableRange`: size not in {1,2,4,8} or base unaligned
/// - `AlreadyBound`: an enabled slot already covers exactly this range
/// - `ResourceExhausted`: all slots in use
pub fn setup_watchpoint(
    regs: &mut X64DebugRegs,
    range: AddressRange,
    access: WatchAccess,
    slot_count: usize,
) -> Result<WatchpointInstallation>
{
    let slot_count = slot_count.min(MAX_HW_SLOTS);

    let len_bits = encode_len(range.size()).ok_or(StakeoutError::UnrepresentableRange(range))?;
    if range.begin().value() % range.size() != 0 {
        return Err(StakeoutError::UnrepresentableRange(range));
    }

    for slot in 0..slot_count {
        if regs.is_enabled_watchpoint(slot) && regs.watch_range(slot) == range {
            return Err(StakeoutError::AlreadyBound(range));
        }
    }

    let slot = (0..slot_count)
        .find(|&slot| !regs.slot_enabled(slot))
        .ok_or_else(|| {
            StakeoutError::ResourceExhausted(format!(
                "no free debug-register slot for watchpoint over {range} (all {slot_count} in use)"
            ))
        })?;

    let rw_bits = match access {
        WatchAccess::Write => RW_WRITE,
        WatchAccess::ReadWrite => RW_READ_WRITE,
    };

    regs.dr[slot] = range.begin().value();
    regs.dr7 |= l_bit(slot);
    regs.dr7 &= !(0xF << rw_shift(slot));
    regs.dr7 |= rw_bits << rw_shift(slot);
    regs.dr7 |= len_bits << len_shift(slot);

    Ok(WatchpointInstallation { slot, range })
}

/// Remove the watchpoint previously installed over `range`.
///
/// Matched against the installed range (which on x86-64 is always the range
/// the caller originally requested).
///
/// ## Errors
///
/// - `WatchpointNotInstalled`: no enabled watch slot covers exactly `range`
pub fn remove_watchpoint(regs: &mut X64DebugRegs, range: AddressRange, slot_count: usize) -> Result<()>
{
    let slot_count = slot_count.min(MAX_HW_SLOTS);

    for slot in 0..slot_count {
        if regs.is_enabled_watchpoint(slot) && regs.watch_range(slot) == range {
            regs.clear_slot(slot);
            return Ok(());
        }
    }
    Err(StakeoutError::WatchpointNotInstalled(range))
}

/// Which slot triggered the last debug exception, per DR6 bits B0-B3.
///
/// Returns the lowest set slot among the enabled ones, or `None` when the
/// exception was not raised by a debug-register slot (e.g. single-step).
#[must_use]
pub fn hit_slot(regs: &X64DebugRegs) -> Option<usize>
{
    (0..MAX_HW_SLOTS).find(|&slot| regs.dr6 & (1 << slot) != 0 && regs.slot_enabled(slot))
}
