//! In-memory `TargetBackend` shared by the integration tests.
//!
//! Models one target with two threads, a register file, a debug register
//! file and a few memory regions. Every kernel call is appended to an event
//! log so tests can check suspend/resume pairing and protection history.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use armtrap_core::platform::{MachError, MachResult, TargetBackend};
use armtrap_core::types::{
    Address, DebugState, ExceptionPort, ProcessId, Protection, RegionInfo, RegisterSnapshot, TaskHandle, ThreadHandle,
};
use armtrap_core::Session;

pub const PID: u32 = 4242;
pub const PRIMARY: ThreadHandle = ThreadHandle(0x2003);
pub const SECONDARY: ThreadHandle = ThreadHandle(0x2103);
pub const PAGE_SIZE: u64 = 0x4000;

/// Readable, not writable: needs escalation
pub const DATA_REGION: u64 = 0x10_0000;
/// Readable and executable, holds "Hello" at 0x2003
pub const TEXT_REGION: u64 = 0x2000;

/// Task port the mock hands out for `pid`.
pub fn task_for(pid: u32) -> TaskHandle
{
    TaskHandle(0x1000 + pid)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event
{
    ThreadSuspend(ThreadHandle),
    ThreadResume(ThreadHandle),
    ReleaseThread(ThreadHandle),
    SetThreadState,
    SetDebugState,
    Read(Address, usize),
    Write(Address, usize),
    Protect(Address, u64, Protection),
    TaskSuspend,
    TaskResume,
    Bind,
}

#[derive(Debug, Clone)]
pub struct Region
{
    pub start: u64,
    pub data: Vec<u8>,
    pub protection: Protection,
    pub max_protection: Protection,
}

/// Failure switches, all off by default
#[derive(Debug, Default)]
pub struct Faults
{
    pub deny_attach: Cell<bool>,
    pub no_threads: Cell<bool>,
    pub enumerate: Cell<bool>,
    pub suspend: Cell<bool>,
    pub resume: Cell<bool>,
    pub get_thread_state: Cell<bool>,
    pub set_debug_state: Cell<bool>,
    pub bind: Cell<bool>,
    pub write: Cell<bool>,
    pub region: Cell<bool>,
    /// Fail `protect` calls that add write permission
    pub escalate: Cell<bool>,
    /// Fail `protect` calls that drop write permission
    pub restore: Cell<bool>,
}

#[derive(Debug)]
pub struct MockBackend
{
    pub registers: RefCell<RegisterSnapshot>,
    pub debug: RefCell<DebugState>,
    pub regions: RefCell<Vec<Region>>,
    pub events: RefCell<Vec<Event>>,
    pub faults: Faults,
    next_port: Cell<u32>,
}

impl MockBackend
{
    pub fn new() -> Self
    {
        let mut registers = RegisterSnapshot::default();
        for (i, reg) in registers.x.iter_mut().enumerate() {
            *reg = 0x1000 + i as u64;
        }
        registers.fp = 0x16f0_0000;
        registers.lr = 0x1_0000_3f00;
        registers.sp = 0x16ef_ff00;
        registers.pc = 0x1_0000_3f80;
        registers.cpsr = 0x6000_0000;

        let mut text = vec![0u8; 0x1000];
        text[3..8].copy_from_slice(b"Hello");

        let regions = vec![
            Region {
                start: TEXT_REGION,
                data: text,
                protection: Protection::READ | Protection::EXECUTE,
                max_protection: Protection::READ | Protection::WRITE | Protection::EXECUTE,
            },
            Region {
                start: DATA_REGION,
                data: vec![0u8; 0x8000],
                protection: Protection::READ,
                max_protection: Protection::READ | Protection::WRITE,
            },
        ];

        Self {
            registers: RefCell::new(registers),
            debug: RefCell::new(DebugState::default()),
            regions: RefCell::new(regions),
            events: RefCell::new(Vec::new()),
            faults: Faults::default(),
            next_port: Cell::new(0x3003),
        }
    }

    fn log(&self, event: Event)
    {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event>
    {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self)
    {
        self.events.borrow_mut().clear();
    }

    pub fn count(&self, wanted: Event) -> usize
    {
        self.events.borrow().iter().filter(|event| **event == wanted).count()
    }

    /// (suspends, resumes) of the primary thread.
    pub fn suspend_balance(&self) -> (usize, usize)
    {
        (self.count(Event::ThreadSuspend(PRIMARY)), self.count(Event::ThreadResume(PRIMARY)))
    }

    pub fn protect_calls(&self) -> Vec<Protection>
    {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Protect(_, _, protection) => Some(*protection),
                _ => None,
            })
            .collect()
    }

    pub fn protection_at(&self, address: u64) -> Option<Protection>
    {
        self.regions
            .borrow()
            .iter()
            .find(|region| address >= region.start && address < region.start + region.data.len() as u64)
            .map(|region| region.protection)
    }

    /// Add a zero-filled region at `[start, start + size)`.
    pub fn map(&self, start: u64, size: usize, protection: Protection)
    {
        self.regions.borrow_mut().push(Region {
            start,
            data: vec![0u8; size],
            protection,
            max_protection: Protection::READ | Protection::WRITE | Protection::EXECUTE,
        });
    }

    pub fn poke(&self, address: u64, bytes: &[u8])
    {
        let mut regions = self.regions.borrow_mut();
        let region = regions
            .iter_mut()
            .find(|region| address >= region.start && address < region.start + region.data.len() as u64)
            .expect("poke outside mock memory");
        let offset = (address - region.start) as usize;
        region.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn with_region<T>(&self, address: Address, f: impl FnOnce(&mut Region, usize) -> MachResult<T>) -> MachResult<T>
    {
        let mut regions = self.regions.borrow_mut();
        let region = regions
            .iter_mut()
            .find(|region| {
                address.value() >= region.start && address.value() < region.start + region.data.len() as u64
            })
            .ok_or(MachError::InvalidAddress)?;
        let offset = (address.value() - region.start) as usize;
        f(region, offset)
    }
}

impl TargetBackend for MockBackend
{
    fn task_for_pid(&self, pid: ProcessId) -> MachResult<TaskHandle>
    {
        if self.faults.deny_attach.get() {
            return Err(MachError::Failure);
        }
        Ok(task_for(pid.0))
    }

    fn task_threads(&self, _task: TaskHandle) -> MachResult<Vec<ThreadHandle>>
    {
        if self.faults.enumerate.get() {
            return Err(MachError::InvalidArgument);
        }
        if self.faults.no_threads.get() {
            return Ok(Vec::new());
        }
        Ok(vec![PRIMARY, SECONDARY])
    }

    fn release_thread(&self, thread: ThreadHandle)
    {
        self.log(Event::ReleaseThread(thread));
    }

    fn thread_suspend(&self, thread: ThreadHandle) -> MachResult<()>
    {
        if self.faults.suspend.get() {
            return Err(MachError::Failure);
        }
        self.log(Event::ThreadSuspend(thread));
        Ok(())
    }

    fn thread_resume(&self, thread: ThreadHandle) -> MachResult<()>
    {
        self.log(Event::ThreadResume(thread));
        if self.faults.resume.get() {
            return Err(MachError::Failure);
        }
        Ok(())
    }

    fn get_thread_state(&self, _thread: ThreadHandle) -> MachResult<RegisterSnapshot>
    {
        if self.faults.get_thread_state.get() {
            return Err(MachError::Failure);
        }
        Ok(*self.registers.borrow())
    }

    fn set_thread_state(&self, _thread: ThreadHandle, state: &RegisterSnapshot) -> MachResult<()>
    {
        self.log(Event::SetThreadState);
        *self.registers.borrow_mut() = *state;
        Ok(())
    }

    fn get_debug_state(&self, _thread: ThreadHandle) -> MachResult<DebugState>
    {
        Ok(*self.debug.borrow())
    }

    fn set_debug_state(&self, _thread: ThreadHandle, state: &DebugState) -> MachResult<()>
    {
        if self.faults.set_debug_state.get() {
            return Err(MachError::InvalidArgument);
        }
        self.log(Event::SetDebugState);
        *self.debug.borrow_mut() = *state;
        Ok(())
    }

    fn read_memory(&self, _task: TaskHandle, address: Address, buf: &mut [u8]) -> MachResult<usize>
    {
        self.log(Event::Read(address, buf.len()));
        let len = buf.len();
        self.with_region(address, |region, offset| {
            let bytes = region.data.get(offset..offset + len).ok_or(MachError::InvalidAddress)?;
            buf.copy_from_slice(bytes);
            Ok(len)
        })
    }

    fn write_memory(&self, _task: TaskHandle, address: Address, data: &[u8]) -> MachResult<()>
    {
        self.log(Event::Write(address, data.len()));
        if self.faults.write.get() {
            return Err(MachError::ProtectionFailure);
        }
        // byte at a time so a word can straddle two regions
        for (i, byte) in data.iter().enumerate() {
            self.with_region(Address::new(address.value() + i as u64), |region, offset| {
                if !region.protection.contains(Protection::WRITE) {
                    return Err(MachError::ProtectionFailure);
                }
                region.data[offset] = *byte;
                Ok(())
            })?;
        }
        Ok(())
    }

    fn region_info(&self, _task: TaskHandle, address: Address) -> MachResult<RegionInfo>
    {
        if self.faults.region.get() {
            return Err(MachError::InvalidArgument);
        }
        let regions = self.regions.borrow();
        regions
            .iter()
            .filter(|region| address.value() < region.start + region.data.len() as u64)
            .min_by_key(|region| region.start)
            .map(|region| RegionInfo {
                start: Address::new(region.start),
                size: region.data.len() as u64,
                protection: region.protection,
                max_protection: region.max_protection,
            })
            .ok_or(MachError::NoSpace)
    }

    fn protect(&self, _task: TaskHandle, address: Address, size: u64, protection: Protection) -> MachResult<()>
    {
        let adds_write = protection.contains(Protection::WRITE);
        if adds_write && self.faults.escalate.get() {
            return Err(MachError::ProtectionFailure);
        }
        if !adds_write && self.faults.restore.get() {
            return Err(MachError::ProtectionFailure);
        }
        self.log(Event::Protect(address, size, protection));

        let mut regions = self.regions.borrow_mut();
        for region in regions.iter_mut() {
            let end = region.start + region.data.len() as u64;
            if address.value() < end && address.value() + size > region.start {
                if !region.max_protection.contains(Protection::from_bits(protection.bits() & 0x7)) {
                    return Err(MachError::ProtectionFailure);
                }
                region.protection = Protection::from_bits(protection.bits() & 0x7);
            }
        }
        Ok(())
    }

    fn task_suspend(&self, _task: TaskHandle) -> MachResult<()>
    {
        self.log(Event::TaskSuspend);
        Ok(())
    }

    fn task_resume(&self, _task: TaskHandle) -> MachResult<()>
    {
        self.log(Event::TaskResume);
        Ok(())
    }

    fn bind_exception_port(&self, _task: TaskHandle) -> MachResult<ExceptionPort>
    {
        self.log(Event::Bind);
        if self.faults.bind.get() {
            return Err(MachError::Failure);
        }
        let port = self.next_port.get();
        self.next_port.set(port + 0x100);
        Ok(ExceptionPort(port))
    }

    fn page_size(&self) -> u64
    {
        PAGE_SIZE
    }
}

/// A session attached to [`PID`] with the event log cleared.
pub fn attached_session() -> Session<MockBackend>
{
    let mut session = Session::new(MockBackend::new());
    session.attach(ProcessId(PID)).expect("attach to mock target");
    session.backend().clear_events();
    session
}
