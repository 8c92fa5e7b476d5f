//! # Register Accessor
//!
//! Reads and writes the register snapshot of the target's first thread.
//! Every access suspends the thread for its duration and fetches a fresh
//! snapshot; nothing is cached between commands.

use tracing::debug;

use crate::error::{DebuggerError, Result};
use crate::platform::TargetBackend;
use crate::session::Session;
use crate::threads::with_suspended_primary;
use crate::types::{RegisterName, RegisterSnapshot};

impl<B: TargetBackend> Session<B>
{
    /// Fetch the full register snapshot.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`, `ThreadEnumerationFailed`, `SuspendFailed`, `ResumeFailed`
    /// - `RegisterStateFailed`: `thread_get_state()` failed
    pub fn read_registers(&self) -> Result<RegisterSnapshot>
    {
        let task = self.task()?;
        with_suspended_primary(&self.backend, task, |thread| {
            self.backend.get_thread_state(thread).map_err(|source| DebuggerError::RegisterStateFailed {
                operation: "read thread state",
                source,
            })
        })
    }

    /// Fetch a single register by name.
    ///
    /// ## Errors
    ///
    /// As [`read_registers`](Self::read_registers), plus `UnknownRegister`.
    pub fn read_register(&self, name: &str) -> Result<u64>
    {
        let task = self.task()?;
        with_suspended_primary(&self.backend, task, |thread| {
            let snapshot = self.backend.get_thread_state(thread).map_err(|source| {
                DebuggerError::RegisterStateFailed {
                    operation: "read thread state",
                    source,
                }
            })?;
            let register: RegisterName = name.parse()?;
            snapshot
                .get(register)
                .ok_or_else(|| DebuggerError::UnknownRegister(name.to_string()))
        })
    }

    /// Set one register and commit the snapshot.
    ///
    /// The name is resolved inside the suspended window, so an unknown name
    /// still suspends and resumes the thread exactly once and never commits.
    ///
    /// ## Errors
    ///
    /// - `UnknownRegister`: name outside x0-x28, lr, pc, cpsr, pad
    /// - `ValueOutOfRange`: value wider than a 32-bit register
    /// - `RegisterStateFailed`: `thread_get_state()` / `thread_set_state()` failed
    /// - `NotAttached`, `ThreadEnumerationFailed`, `SuspendFailed`, `ResumeFailed`
    pub fn write_register(&self, name: &str, value: u64) -> Result<()>
    {
        let task = self.task()?;
        with_suspended_primary(&self.backend, task, |thread| {
            let mut snapshot = self.backend.get_thread_state(thread).map_err(|source| {
                DebuggerError::RegisterStateFailed {
                    operation: "read thread state",
                    source,
                }
            })?;

            let register: RegisterName = name.parse()?;
            snapshot.set(register, value)?;

            self.backend
                .set_thread_state(thread, &snapshot)
                .map_err(|source| DebuggerError::RegisterStateFailed {
                    operation: "write thread state",
                    source,
                })?;
            debug!("{register} = 0x{value:x}");
            Ok(())
        })
    }
}
