//! Shared in-memory mocks for the collaborator traits.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use stakeout_core::arch::DebugRegisters;
use stakeout_core::breakpoint::BreakpointDelegate;
use stakeout_core::error::{Result, StakeoutError};
use stakeout_core::handles::{ProcessHandle, SuspendToken, ThreadHandle};
use stakeout_core::types::{Address, AddressRange, BreakpointId, ProcessKoid, ThreadKoid};
use stakeout_core::watchpoint::WatchpointDelegate;
use stakeout_core::Architecture;

/// Shared operation log, so tests can assert cross-thread ordering.
pub type OpLog = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> OpLog
{
    Rc::new(RefCell::new(Vec::new()))
}

pub struct TestSuspendToken
{
    suspended: Rc<Cell<u32>>,
}

impl SuspendToken for TestSuspendToken {}

impl Drop for TestSuspendToken
{
    fn drop(&mut self)
    {
        self.suspended.set(self.suspended.get() - 1);
    }
}

/// In-memory thread: a koid, a register snapshot, and failure toggles.
pub struct TestThread
{
    koid: ThreadKoid,
    pub regs: RefCell<DebugRegisters>,
    suspended: Rc<Cell<u32>>,
    pub fail_suspend: Cell<bool>,
    pub fail_write: Cell<bool>,
    log: OpLog,
}

impl TestThread
{
    pub fn new(koid: u64, arch: Architecture, log: OpLog) -> Self
    {
        TestThread {
            koid: ThreadKoid(koid),
            regs: RefCell::new(DebugRegisters::empty(arch)),
            suspended: Rc::new(Cell::new(0)),
            fail_suspend: Cell::new(false),
            fail_write: Cell::new(false),
            log,
        }
    }

    /// How many suspensions are currently held (0 when every token has
    /// been dropped).
    pub fn suspend_count(&self) -> u32
    {
        self.suspended.get()
    }
}

impl ThreadHandle for TestThread
{
    fn koid(&self) -> ThreadKoid
    {
        self.koid
    }

    fn suspend(&self) -> Result<Box<dyn SuspendToken + '_>>
    {
        if self.fail_suspend.get() {
            return Err(StakeoutError::ThreadGone(self.koid));
        }
        self.suspended.set(self.suspended.get() + 1);
        self.log.borrow_mut().push(format!("suspend {}", self.koid.raw()));
        Ok(Box::new(TestSuspendToken {
            suspended: Rc::clone(&self.suspended),
        }))
    }

    fn read_debug_registers(&self) -> Result<DebugRegisters>
    {
        Ok(*self.regs.borrow())
    }

    fn write_debug_registers(&self, regs: &DebugRegisters) -> Result<()>
    {
        if self.fail_write.get() {
            return Err(StakeoutError::WriteRegistersFailed("simulated failure".into()));
        }
        *self.regs.borrow_mut() = *regs;
        self.log.borrow_mut().push(format!("write {}", self.koid.raw()));
        Ok(())
    }
}

/// In-memory process holding its threads.
pub struct TestProcess
{
    koid: ProcessKoid,
    pub threads: Vec<TestThread>,
    pub log: OpLog,
}

impl TestProcess
{
    pub fn new(koid: u64, arch: Architecture, thread_koids: &[u64]) -> Self
    {
        let log = new_log();
        let threads = thread_koids
            .iter()
            .map(|&t| TestThread::new(t, arch, Rc::clone(&log)))
            .collect();
        TestProcess {
            koid: ProcessKoid(koid),
            threads,
            log,
        }
    }

    pub fn thread_mut(&mut self, koid: u64) -> &mut TestThread
    {
        self.threads
            .iter_mut()
            .find(|t| t.koid().raw() == koid)
            .expect("unknown test thread")
    }

    pub fn remove_thread(&mut self, koid: u64)
    {
        self.threads.retain(|t| t.koid().raw() != koid);
    }

    pub fn regs_of(&self, koid: u64) -> DebugRegisters
    {
        *self
            .threads
            .iter()
            .find(|t| t.koid().raw() == koid)
            .expect("unknown test thread")
            .regs
            .borrow()
    }
}

impl ProcessHandle for TestProcess
{
    fn koid(&self) -> ProcessKoid
    {
        self.koid
    }

    fn threads(&self) -> Vec<&dyn ThreadHandle>
    {
        self.threads.iter().map(|t| t as &dyn ThreadHandle).collect()
    }

    fn thread(&self, koid: ThreadKoid) -> Option<&dyn ThreadHandle>
    {
        self.threads
            .iter()
            .find(|t| t.koid() == koid)
            .map(|t| t as &dyn ThreadHandle)
    }
}

/// Delegate that records every registration call.
#[derive(Default)]
pub struct RecordingBreakpointDelegate
{
    pub registered: Vec<(BreakpointId, ProcessKoid, Address)>,
    pub unregistered: Vec<(BreakpointId, ProcessKoid, Address)>,
    pub fail_register: bool,
}

impl BreakpointDelegate for RecordingBreakpointDelegate
{
    fn register_breakpoint(&mut self, id: BreakpointId, process: ProcessKoid, address: Address) -> Result<()>
    {
        if self.fail_register {
            return Err(StakeoutError::ResourceExhausted("simulated".into()));
        }
        self.registered.push((id, process, address));
        Ok(())
    }

    fn unregister_breakpoint(&mut self, id: BreakpointId, process: ProcessKoid, address: Address)
    {
        self.unregistered.push((id, process, address));
    }
}

/// Delegate that records every watchpoint registration call.
#[derive(Default)]
pub struct RecordingWatchpointDelegate
{
    pub registered: Vec<(BreakpointId, ProcessKoid, AddressRange)>,
    pub unregistered: Vec<(BreakpointId, ProcessKoid, AddressRange)>,
    pub fail_register: bool,
}

impl WatchpointDelegate for RecordingWatchpointDelegate
{
    fn register_watchpoint(&mut self, id: BreakpointId, process: ProcessKoid, range: AddressRange) -> Result<()>
    {
        if self.fail_register {
            return Err(StakeoutError::ResourceExhausted("simulated".into()));
        }
        self.registered.push((id, process, range));
        Ok(())
    }

    fn unregister_watchpoint(&mut self, id: BreakpointId, process: ProcessKoid, range: AddressRange)
    {
        self.unregistered.push((id, process, range));
    }
}
