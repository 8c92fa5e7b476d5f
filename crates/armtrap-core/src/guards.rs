//! # RAII Guards
//!
//! Guards that pair an acquisition with its release on every exit path.
//!
//! ## Guards
//!
//! - **ThreadSuspendGuard**: suspends a thread and resumes it on drop
//! - **ProtectionGuard**: escalates a page range's protection and restores it on drop
//!
//! Both offer an explicit release (`resume()` / `restore()`) that reports
//! failure. Drop is the fallback for early returns: it still releases, and
//! logs instead of failing silently.

use tracing::error;

use crate::error::{DebuggerError, Result};
use crate::platform::TargetBackend;
use crate::types::{Address, Protection, TaskHandle, ThreadHandle};

/// Suspends a thread and resumes it when dropped.
///
/// ```rust,ignore
/// let guard = ThreadSuspendGuard::new(backend, thread)?;
/// let state = backend.get_thread_state(thread)?; // guard resumes on `?`
/// guard.resume()?;
/// ```
pub struct ThreadSuspendGuard<'a, B: TargetBackend + ?Sized>
{
    backend: &'a B,
    thread: ThreadHandle,
    active: bool,
}

impl<'a, B: TargetBackend + ?Sized> ThreadSuspendGuard<'a, B>
{
    /// Suspend `thread`.
    ///
    /// ## Errors
    ///
    /// - `SuspendFailed`: `thread_suspend()` failed; nothing to undo
    pub fn new(backend: &'a B, thread: ThreadHandle) -> Result<Self>
    {
        backend
            .thread_suspend(thread)
            .map_err(|err| DebuggerError::SuspendFailed(format!("thread_suspend({}) failed: {err}", thread.0)))?;

        Ok(Self {
            backend,
            thread,
            active: true,
        })
    }

    /// Resume the thread now. Dropping the guard afterwards is a no-op.
    pub fn resume(mut self) -> Result<()>
    {
        self.active = false;
        self.backend
            .thread_resume(self.thread)
            .map_err(|err| DebuggerError::ResumeFailed(format!("thread_resume({}) failed: {err}", self.thread.0)))
    }
}

impl<B: TargetBackend + ?Sized> Drop for ThreadSuspendGuard<'_, B>
{
    fn drop(&mut self)
    {
        if self.active {
            if let Err(err) = self.backend.thread_resume(self.thread) {
                error!("thread {} left suspended: thread_resume failed: {err}", self.thread.0);
            }
        }
    }
}

/// Raises the protection of a page range and puts the original back when dropped.
pub struct ProtectionGuard<'a, B: TargetBackend + ?Sized>
{
    backend: &'a B,
    task: TaskHandle,
    start: Address,
    size: u64,
    original: Protection,
    active: bool,
}

impl<'a, B: TargetBackend + ?Sized> ProtectionGuard<'a, B>
{
    /// Apply `escalated` to `[start, start + size)`, remembering `original`.
    ///
    /// ## Errors
    ///
    /// - `ProtectionChangeFailed`: `mach_vm_protect()` refused; the range is untouched
    pub fn escalate(
        backend: &'a B,
        task: TaskHandle,
        start: Address,
        size: u64,
        original: Protection,
        escalated: Protection,
    ) -> Result<Self>
    {
        backend
            .protect(task, start, size, escalated)
            .map_err(|source| DebuggerError::ProtectionChangeFailed { address: start, source })?;

        Ok(Self {
            backend,
            task,
            start,
            size,
            original,
            active: true,
        })
    }

    /// Restore the original protection now. Dropping the guard afterwards is a no-op.
    pub fn restore(mut self) -> Result<()>
    {
        self.active = false;
        self.backend
            .protect(self.task, self.start, self.size, self.original)
            .map_err(|source| DebuggerError::ProtectionChangeFailed {
                address: self.start,
                source,
            })
    }
}

impl<B: TargetBackend + ?Sized> Drop for ProtectionGuard<'_, B>
{
    fn drop(&mut self)
    {
        if self.active {
            if let Err(err) = self.backend.protect(self.task, self.start, self.size, self.original) {
                error!(
                    "protection of {}..+0x{:x} not restored to {}: {err}",
                    self.start, self.size, self.original
                );
            }
        }
    }
}
