//! # armtrap-core
//!
//! Low-level debugging primitives for a single ARM64 target process.
//!
//! This crate provides:
//! - Attaching to a process and holding its task handle ([`Session`])
//! - Suspend/resume discipline around every thread-state access
//! - Register snapshot inspection and mutation
//! - Two 6-slot hardware tables, one for breakpoints and one for watchpoints
//! - Memory reads and protection-preserving writes
//! - A lazily bound exception channel so an armed breakpoint doesn't kill the target
//! - A closed [`Command`] type and a single dispatch function ([`Session::execute`])
//!
//! ## Platform Support
//!
//! - **macOS on Apple Silicon**: [`MachBackend`] uses Mach APIs (`task_for_pid`,
//!   `thread_get_state`, `mach_vm_protect`, ...)
//! - Everything else compiles on any host against the [`TargetBackend`] trait,
//!   which is how the test suite drives the engine.
//!
//! ## Why unsafe code is needed
//!
//! The Mach backend calls kernel interfaces that read and modify another
//! process. Those calls are `unsafe` by nature; they are confined to
//! `platform::macos` and wrapped in safe functions returning `Result`.

#![allow(unsafe_code)] // Required for Mach API calls in platform::macos

pub mod breakpoints;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod exception;
pub mod guards;
pub mod memory;
pub mod platform;
pub mod registers;
pub mod session;
pub mod threads;
pub mod types;

pub use breakpoints::{Slot, SlotKind, MAX_SLOTS};
pub use command::Command;
pub use dispatch::Outcome;
pub use error::{DebuggerError, Result};
#[cfg(all(target_os = "macos", target_arch = "aarch64"))]
pub use platform::macos::MachBackend;
pub use platform::{MachError, TargetBackend};
pub use session::Session;
pub use types::{Address, ProcessId, RegisterName, RegisterSnapshot};
