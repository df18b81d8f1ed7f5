//! Tests for the user-facing breakpoint aggregate: settings diffing, hit
//! accounting, and exception routing.

mod common;

use std::collections::BTreeSet;

use common::RecordingBreakpointDelegate;
use stakeout_core::breakpoint::{does_exception_apply, Breakpoint, HitOutcome};
use stakeout_core::error::StakeoutError;
use stakeout_core::settings::{BreakpointLocation, BreakpointSettings, BreakpointType};
use stakeout_core::types::{Address, BreakpointId, ProcessKoid, ThreadKoid};

fn location(process: u64, thread: Option<u64>, address: u64) -> BreakpointLocation
{
    BreakpointLocation {
        process: ProcessKoid(process),
        thread: thread.map(ThreadKoid),
        address: Address::new(address),
    }
}

fn settings(id: u32, locations: Vec<BreakpointLocation>) -> BreakpointSettings
{
    BreakpointSettings {
        id: BreakpointId::from_raw(id),
        kind: BreakpointType::Hardware,
        name: "test".to_string(),
        one_shot: false,
        locations,
    }
}

#[test]
fn test_set_settings_registers_new_locations()
{
    let mut delegate = RecordingBreakpointDelegate::default();
    let mut bp = Breakpoint::new(BreakpointId::from_raw(1), BreakpointType::Hardware);

    bp.set_settings(&mut delegate, settings(1, vec![location(1, None, 0x1234), location(2, None, 0x5678)]))
        .unwrap();

    assert_eq!(delegate.registered.len(), 2);
    assert!(delegate.unregistered.is_empty());
}

#[test]
fn test_set_settings_moves_one_location_with_one_register_and_one_unregister()
{
    let mut delegate = RecordingBreakpointDelegate::default();
    let mut bp = Breakpoint::new(BreakpointId::from_raw(1), BreakpointType::Hardware);

    bp.set_settings(&mut delegate, settings(1, vec![location(1, None, 0x1234), location(3, None, 0x9999)]))
        .unwrap();
    delegate.registered.clear();

    bp.set_settings(&mut delegate, settings(1, vec![location(2, None, 0x5678), location(3, None, 0x9999)]))
        .unwrap();

    // The unchanged (3, 0x9999) location saw no delegate traffic.
    assert_eq!(
        delegate.registered,
        vec![(BreakpointId::from_raw(1), ProcessKoid(2), Address::new(0x5678))]
    );
    assert_eq!(
        delegate.unregistered,
        vec![(BreakpointId::from_raw(1), ProcessKoid(1), Address::new(0x1234))]
    );
}

#[test]
fn test_set_settings_reports_registration_failure_but_keeps_settings()
{
    let mut delegate = RecordingBreakpointDelegate::default();
    delegate.fail_register = true;
    let mut bp = Breakpoint::new(BreakpointId::from_raw(1), BreakpointType::Hardware);

    let err = bp
        .set_settings(&mut delegate, settings(1, vec![location(1, None, 0x1234)]))
        .unwrap_err();
    assert!(matches!(err, StakeoutError::ResourceExhausted(_)));

    // The declared state still reflects the client's request.
    assert_eq!(bp.settings().locations.len(), 1);
}

#[test]
fn test_on_hit_counts_and_one_shot_requests_removal()
{
    let mut delegate = RecordingBreakpointDelegate::default();
    let mut bp = Breakpoint::new(BreakpointId::from_raw(7), BreakpointType::Hardware);

    let mut one_shot = settings(7, vec![location(1, None, 0x1000)]);
    one_shot.one_shot = true;
    bp.set_settings(&mut delegate, one_shot).unwrap();

    assert_eq!(bp.on_hit(), HitOutcome::RequestRemoval);
    assert_eq!(bp.stats().hit_count, 1);
    assert!(bp.stats().should_delete);
}

#[test]
fn test_on_hit_regular_breakpoint_continues()
{
    let mut bp = Breakpoint::new(BreakpointId::from_raw(7), BreakpointType::Hardware);

    assert_eq!(bp.on_hit(), HitOutcome::Continue);
    assert_eq!(bp.on_hit(), HitOutcome::Continue);
    assert_eq!(bp.stats().hit_count, 2);
    assert!(!bp.stats().should_delete);
}

#[test]
fn test_threads_to_install_resolves_the_all_threads_marker()
{
    let mut delegate = RecordingBreakpointDelegate::default();
    let mut bp = Breakpoint::new(BreakpointId::from_raw(1), BreakpointType::Hardware);

    bp.set_settings(
        &mut delegate,
        settings(
            1,
            vec![
                location(1, Some(11), 0x1000),
                location(1, Some(12), 0x1000),
                location(1, None, 0x2000),
                location(2, Some(21), 0x1000),
            ],
        ),
    )
    .unwrap();

    // Explicit threads for (1, 0x1000); the all-threads location is for a
    // different address.
    let expected: BTreeSet<ThreadKoid> = [ThreadKoid(11), ThreadKoid(12)].into();
    assert_eq!(bp.threads_to_install(ProcessKoid(1), Address::new(0x1000)), Some(expected));

    // The all-threads marker wins for its own address.
    assert_eq!(bp.threads_to_install(ProcessKoid(1), Address::new(0x2000)), None);

    // No matching location at all.
    assert_eq!(
        bp.threads_to_install(ProcessKoid(3), Address::new(0x1000)),
        Some(BTreeSet::new())
    );
}

#[test]
fn test_teardown_unregisters_everything()
{
    let mut delegate = RecordingBreakpointDelegate::default();
    let mut bp = Breakpoint::new(BreakpointId::from_raw(1), BreakpointType::Hardware);

    bp.set_settings(&mut delegate, settings(1, vec![location(1, None, 0x1000), location(2, None, 0x2000)]))
        .unwrap();
    bp.teardown(&mut delegate);

    assert_eq!(delegate.unregistered.len(), 2);
    assert!(bp.settings().locations.is_empty());
}

#[test]
fn test_does_exception_apply_table()
{
    use BreakpointType::{Hardware, ReadWrite, Software, Write};

    // Execution breakpoints only match their own kind.
    assert!(does_exception_apply(Software, Software));
    assert!(!does_exception_apply(Software, Hardware));
    assert!(!does_exception_apply(Software, ReadWrite));
    assert!(!does_exception_apply(Software, Write));

    assert!(does_exception_apply(Hardware, Hardware));
    assert!(!does_exception_apply(Hardware, Software));
    assert!(!does_exception_apply(Hardware, ReadWrite));
    assert!(!does_exception_apply(Hardware, Write));

    // Watch exceptions apply to the watchpoint kinds only.
    assert!(does_exception_apply(ReadWrite, ReadWrite));
    assert!(does_exception_apply(ReadWrite, Write));
    assert!(!does_exception_apply(ReadWrite, Software));
    assert!(!does_exception_apply(ReadWrite, Hardware));

    assert!(does_exception_apply(Write, Write));
    assert!(does_exception_apply(Write, ReadWrite));
    assert!(!does_exception_apply(Write, Software));
    assert!(!does_exception_apply(Write, Hardware));
}
