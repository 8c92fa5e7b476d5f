//! Process, task and port handle types.

use std::fmt;

/// Process identifier (PID)
///
/// PID 0 is the kernel task. [`Session::attach`](crate::Session::attach)
/// refuses it before asking the kernel for anything.
///
/// ## Example
///
/// ```rust
/// use armtrap_core::types::ProcessId;
///
/// let pid = ProcessId::from(12345);
/// assert!(!pid.is_kernel());
/// assert!(ProcessId::KERNEL.is_kernel());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl ProcessId
{
    /// The kernel task.
    pub const KERNEL: Self = ProcessId(0);

    /// Whether this PID names the kernel task.
    pub const fn is_kernel(self) -> bool
    {
        self.0 == 0
    }
}

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Send right to a target task (`mach_port_t` from `task_for_pid()`)
///
/// Opaque to the core; only the backend interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub u32);

/// Thread port (`thread_act_t`) as returned by `task_threads()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadHandle(pub u32);

/// Receive right registered as the target's breakpoint exception port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionPort(pub u32);
