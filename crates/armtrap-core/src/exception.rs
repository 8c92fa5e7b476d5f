//! # Exception Listener
//!
//! When an armed hardware breakpoint or watchpoint fires, the kernel raises
//! `EXC_BREAKPOINT`. With no handler registered that exception terminates the
//! target. Binding a port of ours as the task's breakpoint exception port
//! stops that from happening.
//!
//! The channel is bound lazily by the first `set`, once per target. It only
//! keeps the target alive: no message is received, so the operator isn't told
//! which slot fired.

use tracing::{debug, info};

use crate::error::{DebuggerError, Result};
use crate::platform::TargetBackend;
use crate::types::{ExceptionPort, TaskHandle};

/// Binding state for one target; `Unbound -> Bound` happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExceptionChannel
{
    #[default]
    Unbound,
    Bound(ExceptionPort),
}

impl ExceptionChannel
{
    pub fn is_bound(&self) -> bool
    {
        matches!(self, ExceptionChannel::Bound(_))
    }

    /// Bind the channel if it isn't bound yet.
    ///
    /// Returns `Ok(true)` when this call did the binding and `Ok(false)` when
    /// it was already bound. A failed bind leaves the channel `Unbound` so the
    /// next call tries again.
    ///
    /// ## Errors
    ///
    /// - `ExceptionBindFailed`
    pub fn ensure_bound<B: TargetBackend + ?Sized>(&mut self, backend: &B, task: TaskHandle) -> Result<bool>
    {
        if let ExceptionChannel::Bound(port) = self {
            debug!("exception server already running on port {}", port.0);
            return Ok(false);
        }

        let port = backend.bind_exception_port(task).map_err(DebuggerError::ExceptionBindFailed)?;
        *self = ExceptionChannel::Bound(port);
        info!("exception server started on port {}", port.0);
        Ok(true)
    }
}
