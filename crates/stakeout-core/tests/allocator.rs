//! Tests for the architecture-dispatching slot allocator.

use stakeout_core::arch::{Architecture, DebugRegisters, WatchAccess};
use stakeout_core::error::StakeoutError;
use stakeout_core::types::{Address, AddressRange};
use stakeout_core::HardwareSlotAllocator;

#[test]
fn test_x64_allocator_dispatches_to_the_x64_codec()
{
    let allocator = HardwareSlotAllocator::x64();
    let mut regs = allocator.empty_registers();

    allocator.setup_breakpoint(&mut regs, Address::new(0x1000)).unwrap();
    let DebugRegisters::X64(x64) = regs else {
        panic!("expected an x64 snapshot");
    };
    assert_eq!(x64.dr[0], 0x1000);
}

#[test]
fn test_arm64_allocator_dispatches_to_the_arm64_codec()
{
    let allocator = HardwareSlotAllocator::new(Architecture::Arm64, 6, 4);
    let mut regs = allocator.empty_registers();

    allocator.setup_breakpoint(&mut regs, Address::new(0x1000)).unwrap();
    let installation = allocator
        .setup_watchpoint(&mut regs, AddressRange::new(0x2000, 0x2004), WatchAccess::Write)
        .unwrap();
    assert_eq!(installation.slot, 0);

    let DebugRegisters::Arm64(arm64) = regs else {
        panic!("expected an arm64 snapshot");
    };
    assert_eq!(arm64.hw_bps[0].dbgbvr, 0x1000);
    assert_eq!(arm64.hw_wps[0].dbgwvr, 0x2000);
}

#[test]
fn test_snapshot_architecture_mismatch_is_rejected()
{
    let allocator = HardwareSlotAllocator::new(Architecture::Arm64, 6, 4);
    let mut regs = DebugRegisters::empty(Architecture::X64);

    let err = allocator.setup_breakpoint(&mut regs, Address::new(0x1000)).unwrap_err();
    assert!(matches!(err, StakeoutError::InvalidArgument(_)));

    let err = allocator
        .remove_watchpoint(&mut regs, AddressRange::new(0x2000, 0x2004))
        .unwrap_err();
    assert!(matches!(err, StakeoutError::InvalidArgument(_)));
}

#[test]
fn test_descriptor_counts_are_clamped_to_architecture()
{
    let allocator = HardwareSlotAllocator::new(Architecture::Arm64, 32, 20);
    assert_eq!(allocator.hw_breakpoint_count(), 16);
    assert_eq!(allocator.watchpoint_count(), 16);

    let allocator = HardwareSlotAllocator::new(Architecture::X64, 8, 8);
    assert_eq!(allocator.hw_breakpoint_count(), 4);
    assert_eq!(allocator.watchpoint_count(), 4);
}

#[test]
fn test_runtime_slot_count_limits_allocation()
{
    let allocator = HardwareSlotAllocator::new(Architecture::Arm64, 2, 2);
    let mut regs = allocator.empty_registers();

    allocator.setup_breakpoint(&mut regs, Address::new(0x1000)).unwrap();
    allocator.setup_breakpoint(&mut regs, Address::new(0x2000)).unwrap();
    let err = allocator.setup_breakpoint(&mut regs, Address::new(0x3000)).unwrap_err();
    assert!(matches!(err, StakeoutError::ResourceExhausted(_)));
}

#[test]
fn test_watchpoint_lifecycle_through_the_allocator()
{
    let allocator = HardwareSlotAllocator::new(Architecture::Arm64, 6, 4);
    let mut regs = allocator.empty_registers();

    let range = AddressRange::new(0x2000, 0x2008);
    let installation = allocator.setup_watchpoint(&mut regs, range, WatchAccess::ReadWrite).unwrap();
    assert_eq!(installation.range, range);

    allocator.remove_watchpoint(&mut regs, installation.range).unwrap();
    assert_eq!(regs, allocator.empty_registers());
}
