//! # Platform Backends
//!
//! Every kernel interaction the engine performs goes through [`TargetBackend`].
//! The trait is deliberately thin: one method per kernel capability, each
//! returning the raw [`MachError`] on failure. Mapping those into
//! [`DebuggerError`](crate::DebuggerError) with context, and pairing
//! suspend/resume and escalate/restore, is the engine's job.
//!
//! ## Implementations
//!
//! - **macOS (Apple Silicon)**: [`macos::MachBackend`]
//! - Tests supply an in-memory backend

pub mod error;

#[cfg(all(target_os = "macos", target_arch = "aarch64"))]
pub mod macos;

pub use error::MachError;

use crate::types::{
    Address, DebugState, ExceptionPort, ProcessId, Protection, RegionInfo, RegisterSnapshot, TaskHandle, ThreadHandle,
};

/// Result of a raw kernel call
pub type MachResult<T> = std::result::Result<T, MachError>;

/// Kernel capabilities needed to debug one target
///
/// All methods take `&self`: handles are plain port names and the engine runs
/// one command at a time, so a backend needs no interior state of its own.
pub trait TargetBackend
{
    /// `task_for_pid()`: obtain a send right to the target's task.
    fn task_for_pid(&self, pid: ProcessId) -> MachResult<TaskHandle>;

    /// `task_threads()`: enumerate the target's threads in kernel order.
    fn task_threads(&self, task: TaskHandle) -> MachResult<Vec<ThreadHandle>>;

    /// Release a thread port returned by [`task_threads`](Self::task_threads).
    fn release_thread(&self, thread: ThreadHandle);

    fn thread_suspend(&self, thread: ThreadHandle) -> MachResult<()>;

    fn thread_resume(&self, thread: ThreadHandle) -> MachResult<()>;

    /// `thread_get_state(ARM_THREAD_STATE64)`
    fn get_thread_state(&self, thread: ThreadHandle) -> MachResult<RegisterSnapshot>;

    /// `thread_set_state(ARM_THREAD_STATE64)`
    fn set_thread_state(&self, thread: ThreadHandle, state: &RegisterSnapshot) -> MachResult<()>;

    /// `thread_get_state(ARM_DEBUG_STATE64)`
    fn get_debug_state(&self, thread: ThreadHandle) -> MachResult<DebugState>;

    /// `thread_set_state(ARM_DEBUG_STATE64)`
    fn set_debug_state(&self, thread: ThreadHandle, state: &DebugState) -> MachResult<()>;

    /// Copy target memory into `buf`, returning the number of bytes copied.
    fn read_memory(&self, task: TaskHandle, address: Address, buf: &mut [u8]) -> MachResult<usize>;

    fn write_memory(&self, task: TaskHandle, address: Address, data: &[u8]) -> MachResult<()>;

    /// `mach_vm_region()`: the region containing `address`, or the next one above it.
    fn region_info(&self, task: TaskHandle, address: Address) -> MachResult<RegionInfo>;

    /// `mach_vm_protect()` on the current (not maximum) protection.
    fn protect(&self, task: TaskHandle, address: Address, size: u64, protection: Protection) -> MachResult<()>;

    fn task_suspend(&self, task: TaskHandle) -> MachResult<()>;

    fn task_resume(&self, task: TaskHandle) -> MachResult<()>;

    /// Allocate a port with a send right and register it as the task's
    /// `EXC_MASK_BREAKPOINT` handler (`EXCEPTION_STATE`, `ARM_THREAD_STATE64`).
    fn bind_exception_port(&self, task: TaskHandle) -> MachResult<ExceptionPort>;

    /// VM page size of the target.
    fn page_size(&self) -> u64;
}

/// Whether the host process runs with root privileges.
///
/// `task_for_pid()` requires root in addition to the debugger entitlement.
pub fn is_privileged() -> bool
{
    // SAFETY: getuid/geteuid have no preconditions
    unsafe { libc::geteuid() == 0 || libc::getuid() == 0 }
}
