//! # Error Types
//!
//! General error handling for the debugging engine.
//!
//! We use `thiserror` to generate the `Error` trait implementations and the
//! operator-facing messages. Kernel failures keep their [`MachError`] as the
//! error source so the raw `kern_return_t` is never lost.

use thiserror::Error;

use crate::breakpoints::SlotKind;
use crate::platform::MachError;
use crate::types::{Address, RegisterName};

/// Main error type for engine operations
///
/// Every variant is surfaced to the operator as a status line; none of them
/// is fatal to the engine itself. The binary only terminates on attach and
/// privilege failures at startup.
///
/// ## Error Categories
///
/// 1. **Session errors**: InvalidTarget, AttachDenied, NotAttached
/// 2. **Thread errors**: ThreadEnumerationFailed, SuspendFailed, ResumeFailed, RegisterStateFailed
/// 3. **Register errors**: UnknownRegister, ValueOutOfRange
/// 4. **Slot errors**: SlotExhausted, NoActiveSlot
/// 5. **Memory errors**: MemoryAccessDenied, ProtectionChangeFailed
/// 6. **Exception channel errors**: ExceptionBindFailed (logged, never propagated by `set`)
/// 7. **Command errors**: InvalidCommand
#[derive(Error, Debug)]
pub enum DebuggerError
{
    /// The requested PID is the kernel task
    ///
    /// PID 0 is rejected before any handle is requested, regardless of the
    /// privilege the host runs with.
    #[error("Invalid target: PID {0} is the kernel task and cannot be debugged")]
    InvalidTarget(u32),

    /// `task_for_pid()` refused to hand out a task port
    ///
    /// On macOS this means the host is not root or lacks the
    /// `com.apple.security.cs.debugger` entitlement, or the process doesn't exist.
    #[error("Unable to obtain task_for_pid({pid}): {source}")]
    AttachDenied
    {
        /// PID the operator asked for
        pid: u32,
        /// Kernel return code
        #[source]
        source: MachError,
    },

    /// Operation requires an attached target
    #[error("Not attached to a process")]
    NotAttached,

    /// `task_threads()` failed or returned no threads
    ///
    /// No thread was suspended when this is returned.
    #[error("Failed to enumerate threads: {0}")]
    ThreadEnumerationFailed(String),

    /// Failed to suspend a thread or the whole task
    #[error("Failed to suspend: {0}")]
    SuspendFailed(String),

    /// Failed to resume a thread or the whole task
    #[error("Failed to resume: {0}")]
    ResumeFailed(String),

    /// `thread_get_state()` / `thread_set_state()` failed
    #[error("Failed to {operation}: {source}")]
    RegisterStateFailed
    {
        /// Description of the operation that failed
        operation: &'static str,
        /// Kernel return code
        #[source]
        source: MachError,
    },

    /// Register name is not part of the writable namespace (x0-x28, lr, pc, cpsr, pad)
    #[error("Unknown register '{0}'")]
    UnknownRegister(String),

    /// Value does not fit the register's width (cpsr and pad are 32-bit)
    #[error("Value 0x{value:x} does not fit in 32-bit register {register}")]
    ValueOutOfRange
    {
        /// Register being written
        register: RegisterName,
        /// Rejected value
        value: u64,
    },

    /// All hardware comparators of this kind are in use
    #[error("Max amount of hardware {0} registers used ({max} of {max})", max = crate::breakpoints::MAX_SLOTS)]
    SlotExhausted(SlotKind),

    /// `remove` on an empty table
    #[error("No {0}s enabled")]
    NoActiveSlot(SlotKind),

    /// Target memory could not be read, or the address is not mapped
    #[error("Memory access denied at {address}: {details}")]
    MemoryAccessDenied
    {
        /// Address of the access
        address: Address,
        /// What the kernel reported
        details: String,
    },

    /// `mach_vm_protect()` failed while escalating or restoring a page range
    #[error("Failed to change protection at {address}: {source}")]
    ProtectionChangeFailed
    {
        /// Start of the page-aligned range
        address: Address,
        /// Kernel return code
        #[source]
        source: MachError,
    },

    /// Binding the exception port failed
    ///
    /// Breakpoint and watchpoint operations log this and carry on.
    #[error("Could not start breakpoint exception server: {0}")]
    ExceptionBindFailed(#[source] MachError),

    /// Operator text didn't parse into a command
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Convenience type alias for `Result<T, DebuggerError>`
///
/// ```rust
/// use armtrap_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DebuggerError>;
