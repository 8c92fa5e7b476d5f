//! # Dispatch
//!
//! [`Session::execute`] runs one [`Command`] and returns what it produced as
//! an [`Outcome`]. `Outcome` implements `Display`, so a front end only has to
//! print it.

use std::fmt;

use crate::breakpoints::{Slot, SlotKind};
use crate::command::Command;
use crate::error::Result;
use crate::memory::{hex_string, MemoryLines};
use crate::platform::TargetBackend;
use crate::session::Session;
use crate::types::{Address, ProcessId, RegisterSnapshot};

/// Result of a successfully executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome
{
    Pid(ProcessId),
    Attached(ProcessId),
    Bytes
    {
        address: Address,
        bytes: Vec<u8>,
    },
    Lines(MemoryLines),
    Value
    {
        address: Address,
        size: usize,
        value: u64,
    },
    Written
    {
        address: Address,
        value: u64,
    },
    Registers(RegisterSnapshot),
    Register
    {
        name: String,
        value: u64,
    },
    RegisterWritten
    {
        name: String,
        value: u64,
    },
    SlotSet
    {
        kind: SlotKind,
        index: usize,
        address: Address,
    },
    SlotRemoved
    {
        kind: SlotKind,
        slot: Slot,
    },
    Slots
    {
        kind: SlotKind,
        slots: Vec<Slot>,
    },
    Paused,
    Resumed,
    /// Front end shows help for the topic
    Help(Option<String>),
    /// Front end should quit
    Exit,
}

impl fmt::Display for Outcome
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Outcome::Pid(pid) => write!(f, "PID of debugging task: {pid}"),
            Outcome::Attached(pid) => write!(f, "Changed debugging task to task_for_pid({pid})"),
            Outcome::Bytes { bytes, .. } => f.write_str(&hex_string(bytes)),
            Outcome::Lines(lines) => write!(f, "{lines}"),
            Outcome::Value { value, .. } => write!(f, "0x{value:x}"),
            Outcome::Written { address, value } => write!(f, "Wrote 0x{value:x} to {address:#x}"),
            Outcome::Registers(snapshot) => write!(f, "{snapshot}"),
            Outcome::Register { name, value } => write!(f, "{name} = 0x{value:x}"),
            Outcome::RegisterWritten { name, value } => write!(f, "{name} = 0x{value:x}"),
            Outcome::SlotSet { kind, index, address } => write!(f, "Set {kind} {index} at address {address:#x}"),
            Outcome::SlotRemoved { kind, slot } => write!(f, "Removed {kind} {} ({:#x})", slot.index, slot.address),
            Outcome::Slots { kind, slots } => {
                if slots.is_empty() {
                    return write!(f, "No {kind}s enabled");
                }
                let mut first = true;
                for slot in slots {
                    if !first {
                        writeln!(f)?;
                    }
                    first = false;
                    write!(f, "{kind} {slot}")?;
                }
                Ok(())
            }
            Outcome::Paused => f.write_str("Paused task"),
            Outcome::Resumed => f.write_str("Resumed task"),
            Outcome::Help(_) | Outcome::Exit => Ok(()),
        }
    }
}

impl<B: TargetBackend> Session<B>
{
    /// Run one command.
    ///
    /// ## Errors
    ///
    /// Whatever the underlying operation returns; the session stays usable.
    pub fn execute(&mut self, command: Command) -> Result<Outcome>
    {
        match command {
            Command::Pid(None) => self.pid().map(Outcome::Pid),
            Command::Pid(Some(pid)) => self.attach(pid).map(|_| Outcome::Attached(pid)),
            Command::ReadBytes { address, size } => {
                self.read_bytes(address, size).map(|bytes| Outcome::Bytes { address, bytes })
            }
            Command::ReadLines { format, address, lines } => self.read_lines(format, address, lines).map(Outcome::Lines),
            Command::ReadValue { address, size } => self
                .read_value(address, size)
                .map(|value| Outcome::Value { address, size, value }),
            Command::Write { address, value } => {
                self.write_memory(address, value).map(|()| Outcome::Written { address, value })
            }
            Command::RegisterRead(None) => self.read_registers().map(Outcome::Registers),
            Command::RegisterRead(Some(name)) => {
                let value = self.read_register(&name)?;
                Ok(Outcome::Register { name, value })
            }
            Command::RegisterWrite { name, value } => {
                self.write_register(&name, value)?;
                Ok(Outcome::RegisterWritten { name, value })
            }
            Command::SlotSet { kind, address } => {
                self.set_slot(kind, address).map(|index| Outcome::SlotSet { kind, index, address })
            }
            Command::SlotRemove(kind) => self.remove_slot(kind).map(|slot| Outcome::SlotRemoved { kind, slot }),
            Command::SlotList(kind) => self.slots(kind).map(|slots| Outcome::Slots { kind, slots }),
            Command::Pause => self.pause().map(|()| Outcome::Paused),
            Command::Continue => self.resume().map(|()| Outcome::Resumed),
            Command::Help(topic) => Ok(Outcome::Help(topic)),
            Command::Exit => Ok(Outcome::Exit),
        }
    }
}
