//! Integration tests against the real Mach backend
//!
//! These tests require:
//! - Running on Apple Silicon macOS
//! - Nothing else: they only exercise paths that fail before or at `task_for_pid()`
//!
//! Attaching to a live process needs root or the debugger entitlement and is
//! left to manual testing.

#![cfg(all(target_os = "macos", target_arch = "aarch64"))]

use armtrap_core::error::DebuggerError;
use armtrap_core::platform::TargetBackend;
use armtrap_core::types::ProcessId;
use armtrap_core::{MachBackend, Session};

#[test]
fn test_page_size()
{
    let backend = MachBackend::new();
    let page_size = backend.page_size();
    assert!(page_size.is_power_of_two());
    assert!(page_size >= 0x1000);
}

#[test]
fn test_attach_kernel_pid()
{
    let mut session = Session::new(MachBackend::new());
    let result = session.attach(ProcessId::KERNEL);
    assert!(matches!(result, Err(DebuggerError::InvalidTarget(0))));
}

#[test]
fn test_attach_invalid_pid()
{
    let mut session = Session::new(MachBackend::new());
    let result = session.attach(ProcessId::from(u32::MAX));
    assert!(matches!(result, Err(DebuggerError::AttachDenied { .. })));
    assert!(!session.is_attached());
}

#[test]
fn test_not_attached_operations()
{
    let session = Session::new(MachBackend::new());
    assert!(matches!(session.read_registers(), Err(DebuggerError::NotAttached)));
}
