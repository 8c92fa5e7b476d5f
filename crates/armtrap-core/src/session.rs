//! # Target Session
//!
//! [`Session`] owns the backend, the task handle and PID of the debugged
//! process, and every piece of per-target state: both slot tables and the
//! exception channel. Nothing is global; re-attaching starts from a clean
//! slate.
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
//! # fn main() -> armtrap_core::Result<()> {
//! use armtrap_core::{MachBackend, ProcessId, Session};
//!
//! let mut session = Session::new(MachBackend::new());
//! session.attach(ProcessId::from(12345))?;
//! println!("{}", session.read_registers()?);
//! # Ok(())
//! # }
//! # #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
//! # fn main() {}
//! ```

use tracing::{debug, info};

use crate::breakpoints::{SlotKind, SlotTable};
use crate::error::{DebuggerError, Result};
use crate::exception::ExceptionChannel;
use crate::platform::TargetBackend;
use crate::types::{ProcessId, TaskHandle};

/// Per-attachment state, created by `attach` and dropped by `detach`.
#[derive(Debug)]
pub(crate) struct Target
{
    pub(crate) pid: ProcessId,
    pub(crate) task: TaskHandle,
    pub(crate) breakpoints: SlotTable,
    pub(crate) watchpoints: SlotTable,
    pub(crate) exceptions: ExceptionChannel,
}

impl Target
{
    fn new(pid: ProcessId, task: TaskHandle) -> Self
    {
        Self {
            pid,
            task,
            breakpoints: SlotTable::new(SlotKind::Breakpoint),
            watchpoints: SlotTable::new(SlotKind::Watchpoint),
            exceptions: ExceptionChannel::Unbound,
        }
    }

    pub(crate) fn table(&self, kind: SlotKind) -> &SlotTable
    {
        match kind {
            SlotKind::Breakpoint => &self.breakpoints,
            SlotKind::Watchpoint => &self.watchpoints,
        }
    }

    pub(crate) fn table_mut(&mut self, kind: SlotKind) -> &mut SlotTable
    {
        match kind {
            SlotKind::Breakpoint => &mut self.breakpoints,
            SlotKind::Watchpoint => &mut self.watchpoints,
        }
    }
}

/// Debugging session for one target process
///
/// Commands run one at a time through `&mut self`, which is what serializes
/// edits to the slot tables and the debug registers.
#[derive(Debug)]
pub struct Session<B: TargetBackend>
{
    pub(crate) backend: B,
    pub(crate) target: Option<Target>,
}

impl<B: TargetBackend> Session<B>
{
    /// Create an unattached session.
    pub fn new(backend: B) -> Self
    {
        Self { backend, target: None }
    }

    /// The backend this session drives.
    pub fn backend(&self) -> &B
    {
        &self.backend
    }

    /// Attach to `pid`, replacing any current target.
    ///
    /// The previous task port is not released; see `DESIGN.md`. Slot tables
    /// and the exception channel start empty for the new target.
    ///
    /// ## Errors
    ///
    /// - `InvalidTarget`: `pid` is 0 (checked before any kernel call)
    /// - `AttachDenied`: `task_for_pid()` failed; the current target is kept
    pub fn attach(&mut self, pid: ProcessId) -> Result<TaskHandle>
    {
        if pid.is_kernel() {
            return Err(DebuggerError::InvalidTarget(pid.0));
        }

        let task = self
            .backend
            .task_for_pid(pid)
            .map_err(|source| DebuggerError::AttachDenied { pid: pid.0, source })?;

        if let Some(previous) = self.target.replace(Target::new(pid, task)) {
            debug!("replacing target {} (task port {})", previous.pid, previous.task.0);
        }
        info!("Obtained task_for_pid({pid})");
        Ok(task)
    }

    /// Drop the current target and its slot and exception state.
    ///
    /// ## Errors
    ///
    /// - `NotAttached`
    pub fn detach(&mut self) -> Result<()>
    {
        let target = self.target.take().ok_or(DebuggerError::NotAttached)?;
        info!("detached from {}", target.pid);
        Ok(())
    }

    /// PID of the current target.
    pub fn pid(&self) -> Result<ProcessId>
    {
        self.target().map(|target| target.pid)
    }

    pub fn is_attached(&self) -> bool
    {
        self.target.is_some()
    }

    /// Suspend every thread of the target (`task_suspend`).
    ///
    /// ## Errors
    ///
    /// - `NotAttached`
    /// - `SuspendFailed`
    pub fn pause(&mut self) -> Result<()>
    {
        let task = self.target()?.task;
        self.backend
            .task_suspend(task)
            .map_err(|err| DebuggerError::SuspendFailed(format!("task_suspend failed: {err}")))?;
        info!("Pausing task...");
        Ok(())
    }

    /// Resume every thread of the target (`task_resume`).
    ///
    /// ## Errors
    ///
    /// - `NotAttached`
    /// - `ResumeFailed`
    pub fn resume(&mut self) -> Result<()>
    {
        let task = self.target()?.task;
        self.backend
            .task_resume(task)
            .map_err(|err| DebuggerError::ResumeFailed(format!("task_resume failed: {err}")))?;
        info!("Resuming task...");
        Ok(())
    }

    pub(crate) fn target(&self) -> Result<&Target>
    {
        self.target.as_ref().ok_or(DebuggerError::NotAttached)
    }

    pub(crate) fn task(&self) -> Result<TaskHandle>
    {
        self.target().map(|target| target.task)
    }
}
