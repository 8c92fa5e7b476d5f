//! # Thread Controller
//!
//! Every read or write of CPU or debug register state runs inside
//! [`with_suspended_primary`]:
//!
//! 1. enumerate the target's threads
//! 2. take the first one as the only thread we operate on
//! 3. suspend it
//! 4. run the operation
//! 5. resume it, on every exit path
//!
//! Register state is only consistent for a stopped thread, and writing debug
//! registers of a running one can leave the CPU in a mixed state.

use tracing::{debug, error};

use crate::error::{DebuggerError, Result};
use crate::guards::ThreadSuspendGuard;
use crate::platform::TargetBackend;
use crate::types::{TaskHandle, ThreadHandle};

/// Thread ports from one `task_threads()` call, released on drop.
struct ThreadList<'a, B: TargetBackend + ?Sized>
{
    backend: &'a B,
    threads: Vec<ThreadHandle>,
}

impl<'a, B: TargetBackend + ?Sized> ThreadList<'a, B>
{
    fn enumerate(backend: &'a B, task: TaskHandle) -> Result<Self>
    {
        let threads = backend
            .task_threads(task)
            .map_err(|err| DebuggerError::ThreadEnumerationFailed(format!("task_threads failed: {err}")))?;

        let list = Self { backend, threads };
        if list.threads.is_empty() {
            return Err(DebuggerError::ThreadEnumerationFailed("task has no threads".to_string()));
        }
        Ok(list)
    }

    fn primary(&self) -> ThreadHandle
    {
        // non-empty, checked in enumerate
        self.threads[0]
    }
}

impl<B: TargetBackend + ?Sized> Drop for ThreadList<'_, B>
{
    fn drop(&mut self)
    {
        for thread in &self.threads {
            self.backend.release_thread(*thread);
        }
    }
}

/// Run `op` against the target's first thread while it is suspended.
///
/// If `op` fails its error is returned even when the resume fails too (the
/// resume failure is logged). If `op` succeeds but the resume fails, the
/// result is `ResumeFailed`.
///
/// ## Errors
///
/// - `ThreadEnumerationFailed`: nothing was suspended
/// - `SuspendFailed`: `op` never ran
/// - whatever `op` returns
/// - `ResumeFailed`
pub fn with_suspended_primary<B, T, F>(backend: &B, task: TaskHandle, op: F) -> Result<T>
where
    B: TargetBackend + ?Sized,
    F: FnOnce(ThreadHandle) -> Result<T>,
{
    let threads = ThreadList::enumerate(backend, task)?;
    let thread = threads.primary();
    debug!("operating on thread {} of {}", thread.0, threads.threads.len());

    let guard = ThreadSuspendGuard::new(backend, thread)?;
    let outcome = op(thread);
    let resumed = guard.resume();

    match (outcome, resumed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(resume_err)) => {
            error!("{resume_err} after failed operation");
            Err(err)
        }
    }
}
